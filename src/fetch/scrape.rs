use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use scraper::{Html, Selector};
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

use crate::core::config::EnvConfig;
use crate::core::types::{Article, Site, Source};
use crate::fetch::feed::{strip_markup, truncate_chars};
use crate::fetch::http::{get_bytes, FetchFailure};
use crate::fetch::{FetchOutcome, FetchResult};
use crate::pipeline::clamp_future_date;

const MAX_TITLE_LEN: usize = 500;

/// A homepage anchor that looks like an article link.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub url: String,
    pub anchor_text: String,
}

fn same_publisher(host: &str, site_domain: &str) -> bool {
    let host = host.trim_start_matches("www.");
    host == site_domain || host.ends_with(&format!(".{}", site_domain))
}

fn looks_like_article_path(url: &Url) -> bool {
    let path = url.path();
    let segments = path.split('/').filter(|s| !s.is_empty()).count();
    segments >= 2 || path.len() > 20
}

/// Pull candidate article links out of a homepage: anchors inside semantic
/// `<article>` containers first, then any same-host anchor with an
/// article-shaped path.
pub fn extract_candidates(html: &str, base: &Url, site_domain: &str, max: usize) -> Vec<Candidate> {
    let doc = Html::parse_document(html);
    let article_sel = Selector::parse("article a[href]").expect("selector");
    let any_sel = Selector::parse("a[href]").expect("selector");

    let mut out: Vec<Candidate> = Vec::new();
    let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();

    let mut consider = |href: &str, text: String, require_article_path: bool| {
        if out.len() >= max {
            return;
        }
        let Ok(url) = base.join(href.trim()) else {
            return;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return;
        }
        let Some(host) = url.host_str() else {
            return;
        };
        if !same_publisher(host, site_domain) {
            return;
        }
        if require_article_path && !looks_like_article_path(&url) {
            return;
        }
        let key = url.to_string();
        if seen.insert(key.clone()) {
            out.push(Candidate { url: key, anchor_text: text });
        }
    };

    for anchor in doc.select(&article_sel) {
        let href = anchor.value().attr("href").unwrap_or("");
        let text = strip_markup(&anchor.text().collect::<Vec<_>>().join(" "));
        consider(href, text, false);
    }
    for anchor in doc.select(&any_sel) {
        let href = anchor.value().attr("href").unwrap_or("");
        let text = strip_markup(&anchor.text().collect::<Vec<_>>().join(" "));
        consider(href, text, true);
    }

    out
}

fn meta_content(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .next()
        .and_then(|n| n.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn first_text(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .next()
        .map(|n| strip_markup(&n.text().collect::<Vec<_>>().join(" ")))
        .filter(|s| !s.is_empty())
}

fn parse_page_date(raw: &str) -> Option<DateTime<chrono::FixedOffset>> {
    DateTime::parse_from_rfc3339(raw).ok().or_else(|| DateTime::parse_from_rfc2822(raw).ok())
}

/// Extract one article from a fetched page. Returns `None` when no usable
/// title is found.
pub fn extract_article(
    html: &str,
    page_url: &str,
    site_domain: &str,
    tier: u32,
    summary_len: usize,
    now: DateTime<Utc>,
) -> Option<Article> {
    let doc = Html::parse_document(html);

    let title = meta_content(&doc, r#"meta[property="og:title"]"#)
        .or_else(|| first_text(&doc, "title"))
        .or_else(|| first_text(&doc, "h1"))?;

    let published_at = meta_content(&doc, r#"meta[property="article:published_time"]"#)
        .as_deref()
        .and_then(parse_page_date)
        .or_else(|| {
            let sel = Selector::parse("time[datetime]").ok()?;
            doc.select(&sel)
                .next()
                .and_then(|n| n.value().attr("datetime"))
                .and_then(parse_page_date)
        })
        .map(|dt| clamp_future_date(dt, now));

    let summary = meta_content(&doc, r#"meta[name="description"]"#)
        .or_else(|| meta_content(&doc, r#"meta[property="og:description"]"#))
        .or_else(|| first_text(&doc, "article p"))
        .or_else(|| first_text(&doc, "p"))
        .unwrap_or_default();

    let author = meta_content(&doc, r#"meta[name="author"]"#);

    Some(Article {
        title: truncate_chars(&strip_markup(&title), MAX_TITLE_LEN),
        url: page_url.to_string(),
        published_at,
        summary: truncate_chars(&strip_markup(&summary), summary_len),
        author,
        tags: Vec::new(),
        source_domain: site_domain.to_string(),
        quality_score: None,
        source_rank: tier,
    })
}

fn candidates_as_articles(
    candidates: &[Candidate],
    site_domain: &str,
    tier: u32,
) -> Vec<Article> {
    candidates
        .iter()
        .filter(|c| !c.anchor_text.trim().is_empty())
        .map(|c| Article {
            title: truncate_chars(&c.anchor_text, MAX_TITLE_LEN),
            url: c.url.clone(),
            source_domain: site_domain.to_string(),
            source_rank: tier,
            ..Default::default()
        })
        .collect()
}

/// Fetch the scraper source for a site: homepage anchors, then the candidate
/// article pages through the process-wide scrape pool. With deep scraping
/// disabled, articles are built from the anchors alone.
pub async fn fetch_scraper_source(
    client: &reqwest::Client,
    site: &Site,
    source: &Source,
    env: &EnvConfig,
    scrape_pool: Arc<Semaphore>,
    now: DateTime<Utc>,
) -> FetchResult {
    let timeout_ms = source.timeout_ms.unwrap_or(env.deep_scrape_timeout_ms);
    let body = match get_bytes(client, &source.url, timeout_ms).await {
        Ok(body) => body,
        Err(failure) => {
            warn!(site = %site.domain, url = %source.url, error = %failure,
                  "homepage fetch failed");
            let outcome = match failure {
                FetchFailure::Timeout => FetchOutcome::Timeout,
                _ => FetchOutcome::HttpError,
            };
            return FetchResult::failed(source.kind, outcome);
        }
    };

    let html = String::from_utf8_lossy(&body).into_owned();
    let Ok(base) = Url::parse(&source.url) else {
        return FetchResult::failed(source.kind, FetchOutcome::ParseError);
    };
    let candidates = extract_candidates(&html, &base, &site.domain, env.deep_scrape_max);
    debug!(site = %site.domain, candidates = candidates.len(), "homepage anchors extracted");

    if candidates.is_empty() {
        return FetchResult::failed(source.kind, FetchOutcome::Empty);
    }

    if !env.deep_scrape {
        let articles = candidates_as_articles(&candidates, &site.domain, source.priority);
        return FetchResult::from_articles(source.kind, articles);
    }

    let page_futures = candidates.iter().map(|candidate| {
        let client = client.clone();
        let pool = Arc::clone(&scrape_pool);
        let url = candidate.url.clone();
        let site_domain = site.domain.clone();
        let summary_len = env.summary_length;
        let tier = source.priority;
        async move {
            let Ok(_permit) = pool.acquire().await else {
                return None;
            };
            let body = get_bytes(&client, &url, timeout_ms).await.ok()?;
            let html = String::from_utf8_lossy(&body).into_owned();
            extract_article(&html, &url, &site_domain, tier, summary_len, now)
        }
    });

    let mut articles: Vec<Article> = join_all(page_futures).await.into_iter().flatten().collect();

    // Pages that failed to yield anything still leave their anchor behind.
    if articles.is_empty() {
        articles = candidates_as_articles(&candidates, &site.domain, source.priority);
    }

    FetchResult::from_articles(source.kind, articles)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOMEPAGE: &str = r#"<html><body>
      <article><a href="/news/2026/big-story">Big story headline</a></article>
      <a href="/news/world/another-long-article-path">Another headline</a>
      <a href="/about">About</a>
      <a href="https://other-site.com/news/2026/offsite-story">Offsite</a>
      <a href="mailto:tips@example.com">Tips</a>
    </body></html>"#;

    #[test]
    fn candidate_extraction_filters_hosts_and_paths() {
        let base = Url::parse("https://example.com/").unwrap();
        let candidates = extract_candidates(HOMEPAGE, &base, "example.com", 10);
        let urls: Vec<&str> = candidates.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/news/2026/big-story",
                "https://example.com/news/world/another-long-article-path",
            ]
        );
    }

    #[test]
    fn candidate_cap_applies() {
        let base = Url::parse("https://example.com/").unwrap();
        let candidates = extract_candidates(HOMEPAGE, &base, "example.com", 1);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn article_extraction_prefers_meta() {
        let html = r#"<html><head>
          <title>Fallback title | Example</title>
          <meta property="og:title" content="Proper headline"/>
          <meta name="description" content="A concise lead."/>
          <meta name="author" content="Jane Writer"/>
          <meta property="article:published_time" content="2026-07-30T09:30:00+05:30"/>
        </head><body><article><p>Body text.</p></article></body></html>"#;
        let article =
            extract_article(html, "https://example.com/news/x", "example.com", 4, 500, Utc::now())
                .unwrap();
        assert_eq!(article.title, "Proper headline");
        assert_eq!(article.summary, "A concise lead.");
        assert_eq!(article.author.as_deref(), Some("Jane Writer"));
        assert!(article.published_at.is_some());
        assert_eq!(article.source_domain, "example.com");
    }

    #[test]
    fn article_extraction_falls_back_to_page_text() {
        let html = r#"<html><head><title>Only a title</title></head>
          <body><p>First paragraph.</p></body></html>"#;
        let article =
            extract_article(html, "https://example.com/news/y", "example.com", 4, 500, Utc::now())
                .unwrap();
        assert_eq!(article.title, "Only a title");
        assert_eq!(article.summary, "First paragraph.");
        assert!(article.published_at.is_none());
    }

    #[test]
    fn pages_without_titles_are_skipped() {
        assert!(extract_article("<html></html>", "https://e.com/x", "e.com", 4, 500, Utc::now())
            .is_none());
    }

    #[test]
    fn subdomain_hosts_count_as_publisher() {
        assert!(same_publisher("live.example.com", "example.com"));
        assert!(same_publisher("www.example.com", "example.com"));
        assert!(!same_publisher("example.com.evil.net", "example.com"));
    }
}
