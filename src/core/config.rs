use std::path::PathBuf;

use crate::core::error::{NexusError, Result};
use crate::core::types::Site;

// ---------------------------------------------------------------------------
// Engine constants
// ---------------------------------------------------------------------------

/// Default and maximum window for the "recent" operation mode.
pub const MAX_RECENT_DAYS: i64 = 15;
pub const DEFAULT_ARTICLE_COUNT: usize = 10;
/// A tier satisfies the ladder once it yields at least this many articles.
pub const MIN_ARTICLES_THRESHOLD: usize = 5;
pub const DEFAULT_TIMEOUT_MS: u64 = 2_000;
pub const SCRAPER_TIMEOUT_MS: u64 = 5_000;
pub const TOP_NEWS_SITE_LIMIT: usize = 12;
pub const FUZZY_TITLE_THRESHOLD: f64 = 0.85;
/// Wall-clock budget for one ladder tier and for one top-news site.
pub const TIER_DEADLINE_MS: u64 = 10_000;
/// Per-request fan-out cap for the ladder and the orchestrator.
pub const FETCH_POOL_SIZE: usize = 8;
/// Extra sites pulled in by the orchestrator's deep-search pass.
pub const DEEP_SEARCH_EXTRA_SITES: usize = 8;
pub const MAX_COUNT: u64 = 100;
pub const MAX_WINDOW_DAYS: i64 = 365;
pub const DEFAULT_MIN_QUALITY_SCORE: f64 = 35.0;
/// Timeout for resolving one Google News redirect URL.
pub const REDIRECT_RESOLVE_TIMEOUT_MS: u64 = 2_000;

// ---------------------------------------------------------------------------
// Environment knobs
// ---------------------------------------------------------------------------

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => !matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "0" | "false" | "no" | "off" | "disabled"
        ),
        Err(_) => default,
    }
}

/// Runtime knobs, read once at startup. The site list lives next to these in
/// [`Config`]; both are immutable after load.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Per-source cap on articles taken from a single fetch.
    pub max_articles: usize,
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
    pub rate_limit: usize,
    pub rate_window_secs: u64,
    /// When false, sources within a tier run sequentially.
    pub parallel: bool,
    pub config_path: Option<String>,
    /// When false, the scraper source stops at homepage anchors and never
    /// fetches the candidate article pages.
    pub deep_scrape: bool,
    pub deep_scrape_max: usize,
    pub deep_scrape_timeout_ms: u64,
    pub deep_workers: usize,
    pub summary_length: usize,
    pub fuzzy_title_threshold: f64,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            max_articles: env_parse("MAX_ARTICLES", 50),
            cache_ttl_secs: env_parse("CACHE_TTL", 300),
            cache_capacity: env_parse("CACHE_CAPACITY", 1_000),
            rate_limit: env_parse("RATE_LIMIT", 10),
            rate_window_secs: env_parse("RATE_WINDOW", 60),
            parallel: env_bool("PARALLEL", true),
            config_path: std::env::var("CONFIG_PATH").ok().filter(|v| !v.trim().is_empty()),
            deep_scrape: env_bool("DEEP_SCRAPE", true),
            deep_scrape_max: env_parse("DEEP_SCRAPE_MAX", 10),
            deep_scrape_timeout_ms: env_parse("DEEP_SCRAPE_TIMEOUT", SCRAPER_TIMEOUT_MS),
            deep_workers: env_parse("NEWSNEXUS_DEEP_WORKERS", 5),
            summary_length: env_parse("SUMMARY_LENGTH", 500),
            fuzzy_title_threshold: env_parse("FUZZY_TITLE_THRESHOLD", FUZZY_TITLE_THRESHOLD),
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            max_articles: 50,
            cache_ttl_secs: 300,
            cache_capacity: 1_000,
            rate_limit: 10,
            rate_window_secs: 60,
            parallel: true,
            config_path: None,
            deep_scrape: true,
            deep_scrape_max: 10,
            deep_scrape_timeout_ms: SCRAPER_TIMEOUT_MS,
            deep_workers: 5,
            summary_length: 500,
            fuzzy_title_threshold: FUZZY_TITLE_THRESHOLD,
        }
    }
}

// ---------------------------------------------------------------------------
// Site configuration
// ---------------------------------------------------------------------------

/// Shared-immutable configuration: env knobs plus the publisher list.
#[derive(Debug, Clone)]
pub struct Config {
    pub env: EnvConfig,
    pub sites: Vec<Site>,
}

impl Config {
    pub fn new(env: EnvConfig, sites: Vec<Site>) -> Self {
        Self { env, sites }
    }

    /// Load the site list from `CONFIG_PATH`, then `./sites.json`, then
    /// `../sites.json`. First readable file wins.
    pub fn load(env: EnvConfig) -> Result<Self> {
        let mut candidates: Vec<PathBuf> =
            vec![PathBuf::from("sites.json"), PathBuf::from("../sites.json")];
        if let Some(p) = &env.config_path {
            candidates.insert(0, PathBuf::from(p));
        }

        for path in &candidates {
            match std::fs::read_to_string(path) {
                Ok(contents) => {
                    let sites: Vec<Site> = serde_json::from_str(&contents).map_err(|e| {
                        NexusError::Internal(format!(
                            "site config parse error at {}: {}",
                            path.display(),
                            e
                        ))
                    })?;
                    tracing::info!(path = %path.display(), sites = sites.len(), "site config loaded");
                    return Ok(Self::new(env, sites));
                }
                Err(_) => continue,
            }
        }

        Err(NexusError::Internal(format!(
            "no site configuration found (tried {})",
            candidates.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
        )))
    }

    pub fn site_by_domain(&self, domain: &str) -> Option<&Site> {
        self.sites.iter().find(|s| s.domain == domain)
    }

    /// Every site carrying a priority, sorted ascending then by domain. The
    /// tail beyond [`priority_sites`] feeds the orchestrator's deep search.
    pub fn prioritized_sites(&self) -> Vec<&Site> {
        let mut sites: Vec<&Site> =
            self.sites.iter().filter(|s| matches!(s.priority, Some(p) if p >= 1)).collect();
        sites.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.domain.cmp(&b.domain)));
        sites
    }

    /// Sites eligible for top-news selection: priority 1..12.
    pub fn priority_sites(&self) -> Vec<&Site> {
        self.prioritized_sites()
            .into_iter()
            .filter(|s| matches!(s.priority, Some(p) if p <= 12))
            .collect()
    }

    /// Resolve a user-supplied domain token against the configured sites.
    ///
    /// Lower-cases and strips a leading `www.`, then tries exact match,
    /// `token + "."` containment, and plain containment, in that order. When
    /// a stage matches several sites the one with the smaller priority wins,
    /// ties broken lexicographically by domain.
    pub fn match_domain_token(&self, token: &str) -> Option<&Site> {
        let token = token.trim().to_lowercase();
        let token = token.strip_prefix("www.").unwrap_or(&token).to_string();
        if token.is_empty() {
            return None;
        }

        fn best(hits: Vec<&Site>) -> Option<&Site> {
            hits.into_iter().min_by(|a, b| {
                a.priority
                    .unwrap_or(u32::MAX)
                    .cmp(&b.priority.unwrap_or(u32::MAX))
                    .then_with(|| a.domain.cmp(&b.domain))
            })
        }

        let exact: Vec<&Site> = self.sites.iter().filter(|s| s.domain == token).collect();
        if !exact.is_empty() {
            return best(exact);
        }

        let dotted = format!("{}.", token);
        let prefixed: Vec<&Site> =
            self.sites.iter().filter(|s| s.domain.contains(&dotted)).collect();
        if !prefixed.is_empty() {
            return best(prefixed);
        }

        let loose: Vec<&Site> = self.sites.iter().filter(|s| s.domain.contains(&token)).collect();
        best(loose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Source, SourceKind};

    fn site(domain: &str, priority: Option<u32>) -> Site {
        Site {
            name: domain.to_string(),
            domain: domain.to_string(),
            priority,
            sources: vec![Source {
                kind: SourceKind::OfficialRss,
                url: format!("https://{}/rss", domain),
                priority: 1,
                timeout_ms: None,
            }],
        }
    }

    fn config() -> Config {
        Config::new(
            EnvConfig::default(),
            vec![
                site("thehindu.com", Some(2)),
                site("hindustantimes.com", Some(4)),
                site("example-blog.net", None),
                site("news.ycombinator.com", Some(1)),
            ],
        )
    }

    #[test]
    fn exact_match_wins() {
        let c = config();
        assert_eq!(c.match_domain_token("thehindu.com").unwrap().domain, "thehindu.com");
    }

    #[test]
    fn token_matches_by_containment() {
        let c = config();
        // "hindu" is a plain substring of both; the smaller priority wins.
        assert_eq!(c.match_domain_token("hindu").unwrap().domain, "thehindu.com");
        // "news." matches the subdomain form first.
        assert_eq!(c.match_domain_token("news").unwrap().domain, "news.ycombinator.com");
    }

    #[test]
    fn www_prefix_is_stripped() {
        let c = config();
        assert_eq!(c.match_domain_token("www.thehindu.com").unwrap().domain, "thehindu.com");
    }

    #[test]
    fn unknown_token_yields_none() {
        assert!(config().match_domain_token("nosuchsite").is_none());
    }

    #[test]
    fn priority_sites_sorted_and_bounded() {
        let c = config();
        let sites: Vec<&str> = c.priority_sites().iter().map(|s| s.domain.as_str()).collect();
        assert_eq!(sites, vec!["news.ycombinator.com", "thehindu.com", "hindustantimes.com"]);
    }
}
