//! Source execution: one fetch per configured `Source`, dispatched on its
//! kind, plus the tier-walking fallback ladder.

pub mod feed;
pub mod google_news;
pub mod http;
pub mod ladder;
pub mod scrape;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;

use crate::core::config::{EnvConfig, DEFAULT_TIMEOUT_MS};
use crate::core::types::{Article, Site, Source, SourceKind};

/// Terminal state of one source execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Ok,
    Empty,
    Timeout,
    HttpError,
    ParseError,
}

impl FetchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            FetchOutcome::Ok => "ok",
            FetchOutcome::Empty => "empty",
            FetchOutcome::Timeout => "timeout",
            FetchOutcome::HttpError => "http_error",
            FetchOutcome::ParseError => "parse_error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub kind: SourceKind,
    pub articles: Vec<Article>,
    pub outcome: FetchOutcome,
}

impl FetchResult {
    pub fn from_articles(kind: SourceKind, articles: Vec<Article>) -> Self {
        let outcome = if articles.is_empty() { FetchOutcome::Empty } else { FetchOutcome::Ok };
        Self { kind, articles, outcome }
    }

    pub fn failed(kind: SourceKind, outcome: FetchOutcome) -> Self {
        Self { kind, articles: Vec::new(), outcome }
    }
}

/// Executes a single source. Injected into the ladder and the orchestrator
/// so tests can substitute deterministic fixtures.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, site: &Site, source: &Source, window_days: i64) -> FetchResult;
}

/// The production fetcher: HTTP + feed parser + scraper, with the Google
/// News quality gate applied in the `google_news` arm only.
pub struct HttpFetcher {
    client: reqwest::Client,
    env: EnvConfig,
    /// Process-wide worker pool for article-page scraping.
    scrape_pool: Arc<Semaphore>,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client, env: EnvConfig) -> Self {
        let scrape_pool = Arc::new(Semaphore::new(env.deep_workers.max(1)));
        Self { client, env, scrape_pool }
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, site: &Site, source: &Source, window_days: i64) -> FetchResult {
        let now = Utc::now();
        let timeout_ms = source.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);

        match source.kind {
            SourceKind::OfficialRss | SourceKind::Rsshub => {
                feed::fetch_feed_source(
                    &self.client,
                    site,
                    source,
                    timeout_ms,
                    self.env.summary_length,
                    self.env.max_articles,
                    now,
                )
                .await
            }
            SourceKind::GoogleNews => {
                let fetched = feed::fetch_feed_source(
                    &self.client,
                    site,
                    source,
                    timeout_ms,
                    self.env.summary_length,
                    self.env.max_articles,
                    now,
                )
                .await;
                if fetched.outcome != FetchOutcome::Ok {
                    return fetched;
                }
                match google_news::apply_quality_gate(
                    &self.client,
                    fetched.articles,
                    window_days,
                    now,
                )
                .await
                {
                    Some(articles) => FetchResult::from_articles(source.kind, articles),
                    None => FetchResult::failed(source.kind, FetchOutcome::HttpError),
                }
            }
            SourceKind::Scraper => {
                scrape::fetch_scraper_source(
                    &self.client,
                    site,
                    source,
                    &self.env,
                    Arc::clone(&self.scrape_pool),
                    now,
                )
                .await
            }
        }
    }
}
