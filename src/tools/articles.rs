use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::info;

use crate::core::cache::cache_key;
use crate::core::config::MIN_ARTICLES_THRESHOLD;
use crate::core::error::{NexusError, Result};
use crate::core::types::{ArticlesRequest, ArticlesResponse, CachedPayload};
use crate::core::validate::{sanitize_term, validate_count, validate_domain, validate_last_n_days};
use crate::core::AppState;
use crate::fetch::ladder::run_ladder;
use crate::pipeline::filters::FilterSpec;
use crate::pipeline::score::score_and_filter;
use crate::pipeline::sort_articles;

/// Single-domain aggregation: validate, rate-limit, consult the cache, walk
/// the fallback ladder, then filter, score, sort, and cap.
pub async fn get_articles(state: &Arc<AppState>, req: ArticlesRequest) -> Result<ArticlesResponse> {
    let started = Instant::now();
    let env = &state.config.env;

    let domain = validate_domain(&req.domain)?;
    let count = validate_count(req.count)?;
    let window_explicit = req.last_n_days.is_some();
    let window_days = validate_last_n_days(req.last_n_days)?;
    let topic = sanitize_term(req.topic.as_deref())?;
    let location = sanitize_term(req.location.as_deref())?;

    let site = state
        .config
        .match_domain_token(&domain)
        .ok_or_else(|| NexusError::NoMatch(domain.clone()))?
        .clone();

    let filter_fingerprint = format!(
        "days={}|explicit={}|topic={}|loc={}|count={}",
        window_days,
        window_explicit,
        topic.as_deref().unwrap_or(""),
        location.as_deref().unwrap_or(""),
        count
    );
    let key = cache_key("get_articles", &site.domain, &filter_fingerprint);
    if let Some(CachedPayload::Articles { source_used, articles }) = state.cache.get(key) {
        state.metrics.incr("cache_hits");
        return Ok(ArticlesResponse {
            source_used,
            articles,
            cached: true,
            duration_ms: started.elapsed().as_millis() as u64,
            message: None,
        });
    }
    state.metrics.incr("cache_misses");

    // The limiter guards upstream fetches only; cache hits above are free.
    state.rate_limiter.check(&site.domain)?;

    let ladder = run_ladder(
        state.fetcher.as_ref(),
        &site,
        window_days,
        MIN_ARTICLES_THRESHOLD,
        env.fuzzy_title_threshold,
        env.parallel,
    )
    .await;
    state.metrics.observe_ms("ladder_ms", started.elapsed().as_millis() as f64);

    if ladder.articles.is_empty() {
        return Err(NexusError::UpstreamUnavailable(site.domain.clone()));
    }

    let now = Utc::now();
    let spec = FilterSpec::new(window_days, window_explicit, topic.as_deref(), location.as_deref())?;
    let articles = spec.apply(ladder.articles, now);

    // Scores annotate the response; the drop threshold only applies on the
    // top-news surface where the caller can tune it.
    let (mut articles, _) =
        score_and_filter(articles, 0.0, false, |_| site.priority, now);
    sort_articles(&mut articles);
    articles.truncate(count);

    let response = ArticlesResponse {
        source_used: ladder.source_used.clone(),
        articles: articles.clone(),
        cached: false,
        duration_ms: started.elapsed().as_millis() as u64,
        message: ladder.message.clone(),
    };

    // Degraded results stay out of the cache so a later request can retry
    // the full ladder.
    if !ladder.degraded {
        state.cache.put(
            key,
            CachedPayload::Articles { source_used: ladder.source_used, articles },
        );
    }

    info!(domain = %site.domain, source_used = %response.source_used,
          count = response.articles.len(), degraded = ladder.degraded, "get_articles served");
    Ok(response)
}
