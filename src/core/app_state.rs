use std::sync::Arc;
use std::time::Duration;

use crate::core::cache::TtlCache;
use crate::core::config::Config;
use crate::core::metrics::Metrics;
use crate::core::rate_limit::RateLimiter;
use crate::core::types::CachedPayload;
use crate::fetch::{HttpFetcher, SourceFetcher};

/// Shared application state, constructed once in `main` and passed by
/// handle. The cache, rate limiter, and metrics each guard their own
/// synchronization; the config is immutable after load.
#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    pub config: Arc<Config>,
    pub cache: Arc<TtlCache<CachedPayload>>,
    pub rate_limiter: Arc<RateLimiter>,
    pub metrics: Arc<Metrics>,
    pub fetcher: Arc<dyn SourceFetcher>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("sites", &self.config.sites.len())
            .field("cache_entries", &self.cache.len())
            .finish()
    }
}

impl AppState {
    pub fn new(http_client: reqwest::Client, config: Config) -> Self {
        let env = &config.env;
        let cache = Arc::new(TtlCache::new(
            Duration::from_secs(env.cache_ttl_secs),
            env.cache_capacity,
        ));
        let rate_limiter = Arc::new(RateLimiter::new(
            env.rate_limit,
            Duration::from_secs(env.rate_window_secs),
        ));
        let fetcher: Arc<dyn SourceFetcher> =
            Arc::new(HttpFetcher::new(http_client.clone(), env.clone()));
        Self {
            http_client,
            config: Arc::new(config),
            cache,
            rate_limiter,
            metrics: Arc::new(Metrics::new()),
            fetcher,
        }
    }

    /// Substitute the source fetcher; used by tests to stub the network.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }
}
