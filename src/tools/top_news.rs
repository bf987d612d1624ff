use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::core::cache::cache_key;
use crate::core::config::{
    DEEP_SEARCH_EXTRA_SITES, DEFAULT_MIN_QUALITY_SCORE, FETCH_POOL_SIZE, MIN_ARTICLES_THRESHOLD,
    TIER_DEADLINE_MS, TOP_NEWS_SITE_LIMIT,
};
use crate::core::error::{NexusError, Result};
use crate::core::types::{Article, CachedPayload, Site, TopNewsRequest, TopNewsResponse};
use crate::core::validate::{sanitize_term, validate_count, validate_last_n_days};
use crate::core::AppState;
use crate::fetch::ladder::{run_ladder, LadderResult};
use crate::pipeline::dedup::dedup_articles;
use crate::pipeline::diversity::{distinct_domains, select_diverse};
use crate::pipeline::filters::FilterSpec;
use crate::pipeline::score::score_and_filter;
use crate::pipeline::sort_articles;

/// Run the per-site ladders for a set of sites in parallel, each under its
/// own wall-clock deadline. Sites that time out contribute nothing.
async fn fan_out(state: &Arc<AppState>, sites: &[Site], window_days: i64) -> Vec<(Site, LadderResult)> {
    let deadline = Duration::from_millis(TIER_DEADLINE_MS);

    stream::iter(sites.iter().cloned().map(|site| {
        let state = Arc::clone(state);
        async move {
            let outcome = tokio::time::timeout(
                deadline,
                run_ladder(
                    state.fetcher.as_ref(),
                    &site,
                    window_days,
                    MIN_ARTICLES_THRESHOLD,
                    state.config.env.fuzzy_title_threshold,
                    state.config.env.parallel,
                ),
            )
            .await;
            match outcome {
                Ok(result) => Some((site, result)),
                Err(_) => {
                    warn!(domain = %site.domain, "site exceeded deadline, dropped");
                    None
                }
            }
        }
    }))
    .buffer_unordered(FETCH_POOL_SIZE)
    .collect::<Vec<Option<(Site, LadderResult)>>>()
    .await
    .into_iter()
    .flatten()
    .collect()
}

fn merge_site_articles(results: &[(Site, LadderResult)]) -> Vec<Article> {
    let mut merged = Vec::new();
    for (site, ladder) in results {
        for mut article in ladder.articles.iter().cloned() {
            if article.source_domain.is_empty() {
                article.source_domain = site.domain.clone();
            }
            // From here on the rank is the site priority, which drives
            // dedup determinism, scoring bands, and diversity order.
            article.source_rank = site.priority.unwrap_or(u32::MAX);
            merged.push(article);
        }
    }
    merged
}

fn resolve_requested_domains(state: &AppState, tokens: &[String]) -> Result<Vec<Site>> {
    let mut selected: Vec<Site> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut unmatched: Vec<String> = Vec::new();

    for token in tokens {
        match state.config.match_domain_token(token) {
            Some(site) => {
                if seen.insert(site.domain.clone()) {
                    selected.push(site.clone());
                }
            }
            None => unmatched.push(token.clone()),
        }
    }

    if selected.is_empty() {
        return Err(NexusError::NoMatch(unmatched.join(", ")));
    }
    Ok(selected)
}

/// Multi-site aggregation: select sites, fan out ladders, merge, dedup,
/// filter, score, and diversify.
pub async fn get_top_news(state: &Arc<AppState>, req: TopNewsRequest) -> Result<TopNewsResponse> {
    let started = Instant::now();
    let env = &state.config.env;

    let count = validate_count(req.count)?;
    let window_explicit = req.last_n_days.is_some();
    let window_days = validate_last_n_days(req.last_n_days)?;
    let topic = sanitize_term(req.topic.as_deref())?;
    let location = sanitize_term(req.location.as_deref())?;
    let quality_filter_enabled = req.enable_quality_filter.unwrap_or(true);
    let min_quality_score = match req.min_quality_score {
        Some(s) if (0.0..=100.0).contains(&s) => s,
        Some(s) => {
            return Err(NexusError::BadInput(format!(
                "min_quality_score must be in [0,100], got {}",
                s
            )))
        }
        None => DEFAULT_MIN_QUALITY_SCORE,
    };

    let explicit_domains = req.domains.as_deref().map(|d| !d.is_empty()).unwrap_or(false);
    let sites: Vec<Site> = if explicit_domains {
        resolve_requested_domains(state, req.domains.as_deref().unwrap_or_default())?
    } else {
        state.config.priority_sites().into_iter().take(TOP_NEWS_SITE_LIMIT).cloned().collect()
    };

    let mut domains_key: Vec<String> = sites.iter().map(|s| s.domain.clone()).collect();
    domains_key.sort();
    let filter_fingerprint = format!(
        "days={}|explicit={}|topic={}|loc={}|count={}|domains={}|minq={}|qf={}",
        window_days,
        window_explicit,
        topic.as_deref().unwrap_or(""),
        location.as_deref().unwrap_or(""),
        count,
        domains_key.join(","),
        min_quality_score,
        quality_filter_enabled
    );
    let key = cache_key("get_top_news", "TOP", &filter_fingerprint);
    if let Some(CachedPayload::TopNews { sources_used, articles, total_articles, filtered_out }) =
        state.cache.get(key)
    {
        state.metrics.incr("cache_hits");
        return Ok(TopNewsResponse {
            sources_used,
            articles,
            total_articles,
            duration_ms: started.elapsed().as_millis() as u64,
            quality_filter_enabled,
            min_quality_score,
            filtered_out,
        });
    }
    state.metrics.incr("cache_misses");

    let spec = FilterSpec::new(window_days, window_explicit, topic.as_deref(), location.as_deref())?;
    let now = Utc::now();

    let mut site_results = fan_out(state, &sites, window_days).await;

    let process = |results: &[(Site, LadderResult)]| -> (Vec<Article>, usize) {
        let merged = merge_site_articles(results);
        let deduped = dedup_articles(merged, env.fuzzy_title_threshold);
        let filtered = spec.apply(deduped, now);
        let (mut scored, filtered_out) = score_and_filter(
            filtered,
            min_quality_score,
            quality_filter_enabled,
            |a| if a.source_rank == u32::MAX { None } else { Some(a.source_rank) },
            now,
        );
        sort_articles(&mut scored);
        (scored, filtered_out)
    };

    let (mut articles, mut filtered_out) = process(&site_results);

    // Deep search: with no explicit domains and a thin result, pull in the
    // next-priority sites and redo the merge.
    if !explicit_domains && articles.len() < count {
        let already: HashSet<String> = sites.iter().map(|s| s.domain.clone()).collect();
        let extras: Vec<Site> = state
            .config
            .prioritized_sites()
            .into_iter()
            .filter(|s| !already.contains(&s.domain))
            .take(DEEP_SEARCH_EXTRA_SITES)
            .cloned()
            .collect();
        if !extras.is_empty() {
            info!(extra_sites = extras.len(), "deep search engaged");
            let extra_results = fan_out(state, &extras, window_days).await;
            site_results.extend(extra_results);
            let redone = process(&site_results);
            articles = redone.0;
            filtered_out = redone.1;
        }
    }

    if articles.is_empty() && site_results.iter().all(|(_, l)| l.articles.is_empty()) {
        return Err(NexusError::UpstreamUnavailable("top news".into()));
    }

    let total_articles = articles.len();
    let articles = if distinct_domains(&articles) >= 2 {
        select_diverse(articles, count)
    } else {
        let mut a = articles;
        a.truncate(count);
        a
    };

    let sources_used: Vec<String> = site_results
        .iter()
        .filter(|(_, l)| !l.articles.is_empty())
        .map(|(site, l)| format!("{}: {}", site.domain, l.source_used))
        .collect();

    let response = TopNewsResponse {
        sources_used: sources_used.clone(),
        articles: articles.clone(),
        total_articles,
        duration_ms: started.elapsed().as_millis() as u64,
        quality_filter_enabled,
        min_quality_score,
        filtered_out,
    };

    // A degraded ladder anywhere in the fan-out keeps the result out of the
    // cache, so a later request can retry those sites at full strength.
    let any_degraded = site_results.iter().any(|(_, l)| l.degraded);
    if !response.articles.is_empty() && !any_degraded {
        state.cache.put(
            key,
            CachedPayload::TopNews { sources_used, articles, total_articles, filtered_out },
        );
    }

    info!(sites = sites.len(), returned = response.articles.len(),
          total = total_articles, filtered_out, "get_top_news served");
    Ok(response)
}
