use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::core::config::{FETCH_POOL_SIZE, REDIRECT_RESOLVE_TIMEOUT_MS};
use crate::core::types::Article;
use crate::fetch::http::random_user_agent;

const GOOGLE_NEWS_HOST: &str = "news.google.com";
/// A source is discarded outright when fewer than half of its articles
/// resolve away from the Google News redirect host.
const MIN_VALID_RATIO: f64 = 0.5;

fn url_host(raw: &str) -> Option<String> {
    url::Url::parse(raw).ok().and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

pub fn is_google_redirect(raw: &str) -> bool {
    url_host(raw).map(|h| h == GOOGLE_NEWS_HOST).unwrap_or(false)
}

/// Resolve one redirect URL with a bounded HEAD. Returns the final URL only
/// when it escaped the Google News host. No GET fallback is attempted.
async fn resolve_redirect(client: &reqwest::Client, raw: &str) -> Option<url::Url> {
    let response = client
        .head(raw)
        .header("User-Agent", random_user_agent())
        .timeout(Duration::from_millis(REDIRECT_RESOLVE_TIMEOUT_MS))
        .send()
        .await
        .ok()?;

    let final_url = response.url().clone();
    let host = final_url.host_str()?.to_lowercase();
    if host == GOOGLE_NEWS_HOST {
        return None;
    }
    Some(final_url)
}

/// Post-fetch validation for Google News feeds.
///
/// Every redirect-shaped article URL gets a HEAD resolution attempt; on
/// success the article adopts the final URL and its host as
/// `source_domain`. When the surviving share drops below
/// [`MIN_VALID_RATIO`] the whole source is treated as failed (`None`).
/// Articles older than `window_days` are dropped here as well.
pub async fn apply_quality_gate(
    client: &reqwest::Client,
    articles: Vec<Article>,
    window_days: i64,
    now: DateTime<Utc>,
) -> Option<Vec<Article>> {
    if articles.is_empty() {
        return Some(articles);
    }
    let total = articles.len();

    let resolved: Vec<Option<Article>> = stream::iter(articles.into_iter().map(|mut article| {
        let client = client.clone();
        async move {
            if !is_google_redirect(&article.url) {
                return Some(article);
            }
            match resolve_redirect(&client, &article.url).await {
                Some(final_url) => {
                    article.source_domain = final_url
                        .host_str()
                        .map(|h| h.trim_start_matches("www.").to_lowercase())
                        .unwrap_or_else(|| article.source_domain.clone());
                    article.url = final_url.to_string();
                    Some(article)
                }
                None => {
                    debug!(url = %article.url, "google news redirect did not resolve");
                    None
                }
            }
        }
    }))
    .buffer_unordered(FETCH_POOL_SIZE)
    .collect()
    .await;

    let valid: Vec<Article> = resolved.into_iter().flatten().collect();
    let valid_ratio = valid.len() as f64 / total as f64;
    if valid_ratio < MIN_VALID_RATIO {
        warn!(total, valid = valid.len(), "google news source discarded by quality gate");
        return None;
    }

    let fresh: Vec<Article> = valid
        .into_iter()
        .filter(|a| match a.published_at {
            Some(published) => (now - published.with_timezone(&Utc)).num_days() <= window_days,
            None => true,
        })
        .collect();

    info!(total, kept = fresh.len(), "google news source passed quality gate");
    Some(fresh)
}
