use std::collections::BTreeMap;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::core::config::{FETCH_POOL_SIZE, TIER_DEADLINE_MS};
use crate::core::types::{Article, Site, Source};
use crate::fetch::{FetchOutcome, FetchResult, SourceFetcher};
use crate::pipeline::dedup::dedup_articles;

/// Outcome of walking a site's source tiers.
#[derive(Debug, Clone)]
pub struct LadderResult {
    pub articles: Vec<Article>,
    /// Human-readable provenance, e.g. `tier 2 [google_news]`.
    pub source_used: String,
    /// True when no tier reached the article threshold and the best
    /// non-empty tier was returned instead.
    pub degraded: bool,
    pub message: Option<String>,
    pub tiers_tried: Vec<u32>,
}

impl LadderResult {
    fn empty(tiers_tried: Vec<u32>) -> Self {
        Self {
            articles: Vec::new(),
            source_used: "none".to_string(),
            degraded: true,
            message: Some(format!(
                "no articles from any source (tiers tried: {})",
                join_tiers(&tiers_tried)
            )),
            tiers_tried,
        }
    }
}

async fn fetch_with_timeout(
    fetcher: &dyn SourceFetcher,
    site: &Site,
    source: &Source,
    window_days: i64,
    deadline: Duration,
) -> FetchResult {
    match tokio::time::timeout(deadline, fetcher.fetch(site, source, window_days)).await {
        Ok(result) => result,
        Err(_) => FetchResult::failed(source.kind, FetchOutcome::Timeout),
    }
}

fn join_tiers(tiers: &[u32]) -> String {
    tiers.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
}

fn tier_label(tier: u32, results: &[FetchResult]) -> String {
    let mut kinds: Vec<&'static str> = results
        .iter()
        .filter(|r| r.outcome == FetchOutcome::Ok)
        .map(|r| r.kind.label())
        .collect();
    if kinds.is_empty() {
        kinds = results.iter().map(|r| r.kind.label()).collect();
    }
    kinds.dedup();
    format!("tier {} [{}]", tier, kinds.join(", "))
}

/// Walk the site's tiers in ascending order, running each tier's sources in
/// parallel, until a tier survives dedup with at least `threshold` articles.
///
/// The ladder is greedy: the first satisfying tier wins and tiers are never
/// merged. Sources that fail or outlive the tier deadline contribute
/// nothing; if no tier satisfies the threshold, the largest non-empty tier
/// is returned as a degraded result.
pub async fn run_ladder(
    fetcher: &dyn SourceFetcher,
    site: &Site,
    window_days: i64,
    threshold: usize,
    fuzzy_threshold: f64,
    parallel: bool,
) -> LadderResult {
    let mut tiers: BTreeMap<u32, Vec<&Source>> = BTreeMap::new();
    for source in &site.sources {
        tiers.entry(source.priority).or_default().push(source);
    }

    let mut tiers_tried: Vec<u32> = Vec::new();
    let mut best: Option<(u32, Vec<FetchResult>, Vec<Article>)> = None;

    for (tier, sources) in tiers {
        tiers_tried.push(tier);
        let deadline = Duration::from_millis(TIER_DEADLINE_MS);

        let results: Vec<FetchResult> = if parallel {
            let mut futs = Vec::new();
            for source in sources {
                futs.push(fetch_with_timeout(fetcher, site, source, window_days, deadline));
            }
            stream::iter(futs).buffer_unordered(FETCH_POOL_SIZE).collect().await
        } else {
            let mut out = Vec::new();
            for source in sources {
                let result = match tokio::time::timeout(
                    deadline,
                    fetcher.fetch(site, source, window_days),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => FetchResult::failed(source.kind, FetchOutcome::Timeout),
                };
                out.push(result);
            }
            out
        };

        let collected: Vec<Article> =
            results.iter().flat_map(|r| r.articles.iter().cloned()).collect();
        let deduped = dedup_articles(collected, fuzzy_threshold);
        debug!(site = %site.domain, tier, articles = deduped.len(), "tier complete");

        if deduped.len() >= threshold {
            let source_used = tier_label(tier, &results);
            info!(site = %site.domain, %source_used, count = deduped.len(), "ladder satisfied");
            return LadderResult {
                articles: deduped,
                source_used,
                degraded: false,
                message: None,
                tiers_tried,
            };
        }

        let better = match &best {
            Some((_, _, best_articles)) => deduped.len() > best_articles.len(),
            None => !deduped.is_empty(),
        };
        if better {
            best = Some((tier, results, deduped));
        }
    }

    match best {
        Some((tier, results, articles)) => {
            let message = format!(
                "below threshold: tiers {} tried, best tier {} yielded {} article(s)",
                join_tiers(&tiers_tried),
                tier,
                articles.len()
            );
            info!(site = %site.domain, tier, count = articles.len(), "ladder degraded");
            LadderResult {
                source_used: tier_label(tier, &results),
                articles,
                degraded: true,
                message: Some(message),
                tiers_tried,
            }
        }
        None => LadderResult::empty(tiers_tried),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SourceKind;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;

    struct StubFetcher {
        /// Keyed by source URL.
        responses: HashMap<String, FetchResult>,
    }

    #[async_trait]
    impl SourceFetcher for StubFetcher {
        async fn fetch(&self, _site: &Site, source: &Source, _window_days: i64) -> FetchResult {
            self.responses
                .get(&source.url)
                .cloned()
                .unwrap_or_else(|| FetchResult::failed(source.kind, FetchOutcome::HttpError))
        }
    }

    fn articles(prefix: &str, n: usize, tier: u32) -> Vec<Article> {
        (0..n)
            .map(|i| Article {
                title: format!("{} headline number {}", prefix, i),
                url: format!("https://example.com/{}/{}", prefix, i),
                published_at: Some(Utc::now().fixed_offset()),
                source_domain: "example.com".into(),
                source_rank: tier,
                ..Default::default()
            })
            .collect()
    }

    fn site(sources: Vec<Source>) -> Site {
        Site { name: "Example".into(), domain: "example.com".into(), priority: Some(1), sources }
    }

    fn source(kind: SourceKind, url: &str, tier: u32) -> Source {
        Source { kind, url: url.into(), priority: tier, timeout_ms: None }
    }

    #[tokio::test]
    async fn thin_tier_escalates_to_next() {
        let site = site(vec![
            source(SourceKind::OfficialRss, "https://f/1", 1),
            source(SourceKind::GoogleNews, "https://f/2", 2),
        ]);
        let mut responses = HashMap::new();
        responses.insert(
            "https://f/1".to_string(),
            FetchResult::from_articles(SourceKind::OfficialRss, articles("rss", 3, 1)),
        );
        responses.insert(
            "https://f/2".to_string(),
            FetchResult::from_articles(SourceKind::GoogleNews, articles("gn", 9, 2)),
        );
        let fetcher = StubFetcher { responses };

        let result = run_ladder(&fetcher, &site, 15, 5, 0.85, true).await;
        assert!(result.source_used.starts_with("tier 2"));
        assert!(result.source_used.contains("google_news"));
        assert_eq!(result.articles.len(), 9);
        assert!(!result.degraded);
        assert_eq!(result.tiers_tried, vec![1, 2]);
    }

    #[tokio::test]
    async fn satisfied_first_tier_stops_the_walk() {
        let site = site(vec![
            source(SourceKind::OfficialRss, "https://f/1", 1),
            source(SourceKind::Scraper, "https://f/4", 4),
        ]);
        let mut responses = HashMap::new();
        responses.insert(
            "https://f/1".to_string(),
            FetchResult::from_articles(SourceKind::OfficialRss, articles("rss", 6, 1)),
        );
        let fetcher = StubFetcher { responses };

        let result = run_ladder(&fetcher, &site, 15, 5, 0.85, true).await;
        assert_eq!(result.source_used, "tier 1 [official_rss]");
        assert_eq!(result.tiers_tried, vec![1]);
    }

    #[tokio::test]
    async fn failed_sources_do_not_block_escalation() {
        // Official RSS 404s and Google News is gated away; the scraper tier
        // carries the result.
        let site = site(vec![
            source(SourceKind::OfficialRss, "https://f/1", 1),
            source(SourceKind::GoogleNews, "https://f/2", 2),
            source(SourceKind::Scraper, "https://f/4", 4),
        ]);
        let mut responses = HashMap::new();
        responses.insert(
            "https://f/4".to_string(),
            FetchResult::from_articles(SourceKind::Scraper, articles("scrape", 7, 4)),
        );
        let fetcher = StubFetcher { responses };

        let result = run_ladder(&fetcher, &site, 15, 5, 0.85, true).await;
        assert_eq!(result.source_used, "tier 4 [scraper]");
        assert!(!result.degraded);
        assert_eq!(result.tiers_tried, vec![1, 2, 4]);
    }

    #[tokio::test]
    async fn duplicate_across_tiers_appears_once() {
        let shared = Article {
            title: "Shared story about markets".into(),
            url: "https://example.com/shared".into(),
            published_at: Some(Utc::now().fixed_offset()),
            source_domain: "example.com".into(),
            source_rank: 1,
            ..Default::default()
        };
        let mut tier2 = articles("gn", 5, 2);
        tier2.push(shared.clone());

        let site = site(vec![
            source(SourceKind::OfficialRss, "https://f/1", 1),
            source(SourceKind::GoogleNews, "https://f/2", 2),
        ]);
        let mut responses = HashMap::new();
        responses.insert(
            "https://f/1".to_string(),
            FetchResult::from_articles(SourceKind::OfficialRss, vec![shared.clone()]),
        );
        responses.insert(
            "https://f/2".to_string(),
            FetchResult::from_articles(SourceKind::GoogleNews, tier2),
        );
        let fetcher = StubFetcher { responses };

        let result = run_ladder(&fetcher, &site, 15, 5, 0.85, true).await;
        assert!(result.source_used.starts_with("tier 2"));
        let shared_count =
            result.articles.iter().filter(|a| a.url == "https://example.com/shared").count();
        assert_eq!(shared_count, 1);
    }

    #[tokio::test]
    async fn all_tiers_thin_returns_best_with_note() {
        let site = site(vec![
            source(SourceKind::OfficialRss, "https://f/1", 1),
            source(SourceKind::GoogleNews, "https://f/2", 2),
        ]);
        let mut responses = HashMap::new();
        responses.insert(
            "https://f/1".to_string(),
            FetchResult::from_articles(SourceKind::OfficialRss, articles("rss", 2, 1)),
        );
        responses.insert(
            "https://f/2".to_string(),
            FetchResult::from_articles(SourceKind::GoogleNews, articles("gn", 4, 2)),
        );
        let fetcher = StubFetcher { responses };

        let result = run_ladder(&fetcher, &site, 15, 5, 0.85, true).await;
        assert!(result.degraded);
        assert_eq!(result.articles.len(), 4);
        assert!(result.source_used.starts_with("tier 2"));
        let message = result.message.unwrap();
        assert!(message.contains("tiers 1, 2 tried"), "message: {}", message);
        assert!(message.contains("4 article(s)"), "message: {}", message);
    }

    #[tokio::test]
    async fn everything_failing_returns_empty_degraded() {
        let site = site(vec![source(SourceKind::OfficialRss, "https://f/1", 1)]);
        let fetcher = StubFetcher { responses: HashMap::new() };
        let result = run_ladder(&fetcher, &site, 15, 5, 0.85, true).await;
        assert!(result.degraded);
        assert!(result.articles.is_empty());
        assert_eq!(result.source_used, "none");
    }

    #[tokio::test]
    async fn sequential_mode_matches_parallel_semantics() {
        let site = site(vec![
            source(SourceKind::OfficialRss, "https://f/1", 1),
            source(SourceKind::Rsshub, "https://f/1b", 1),
        ]);
        let mut responses = HashMap::new();
        responses.insert(
            "https://f/1".to_string(),
            FetchResult::from_articles(SourceKind::OfficialRss, articles("a", 3, 1)),
        );
        responses.insert(
            "https://f/1b".to_string(),
            FetchResult::from_articles(SourceKind::Rsshub, articles("b", 3, 1)),
        );
        let fetcher = StubFetcher { responses };

        let result = run_ladder(&fetcher, &site, 15, 5, 0.85, false).await;
        assert!(!result.degraded);
        assert_eq!(result.articles.len(), 6);
        assert!(result.source_used.starts_with("tier 1"));
    }
}
