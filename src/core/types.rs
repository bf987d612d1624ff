use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// The unit passed between every pipeline stage.
///
/// `url` uniquely identifies an article within a response. `source_domain` is
/// the canonical host of the publisher that produced the article, which is
/// not necessarily the host of the feed it arrived through.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Article {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<FixedOffset>>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub source_domain: String,
    /// Assigned by the quality scorer; absent until scored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    /// Rank of the producing source: the source tier inside a ladder run,
    /// overwritten with the site priority once articles from different sites
    /// are merged. Drives deterministic dedup ordering and diversity order;
    /// never serialized.
    #[serde(skip, default)]
    pub source_rank: u32,
}

/// How a single upstream source is fetched.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    OfficialRss,
    Rsshub,
    GoogleNews,
    Scraper,
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::OfficialRss => "official_rss",
            SourceKind::Rsshub => "rsshub",
            SourceKind::GoogleNews => "google_news",
            SourceKind::Scraper => "scraper",
        }
    }
}

/// One upstream feed or page for a site. `priority` is the ladder tier
/// (1..4, lower tried first); multiple sources may share a tier.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Source {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub url: String,
    pub priority: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Publisher configuration, loaded from the site configuration file.
///
/// `priority` in 1..12 makes the site eligible for top-news selection;
/// absent priority means the site is only reachable by explicit domain.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Site {
    pub name: String,
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    pub sources: Vec<Source>,
}

// ---------------------------------------------------------------------------
// Tool payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ArticlesRequest {
    pub domain: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, rename = "lastNDays")]
    pub last_n_days: Option<i64>,
    #[serde(default)]
    pub count: Option<u64>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ArticlesResponse {
    #[serde(rename = "sourceUsed")]
    pub source_used: String,
    pub articles: Vec<Article>,
    pub cached: bool,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TopNewsRequest {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, rename = "lastNDays")]
    pub last_n_days: Option<i64>,
    #[serde(default)]
    pub domains: Option<Vec<String>>,
    #[serde(default)]
    pub min_quality_score: Option<f64>,
    #[serde(default)]
    pub enable_quality_filter: Option<bool>,
}

#[derive(Debug, Serialize, Clone)]
pub struct TopNewsResponse {
    pub sources_used: Vec<String>,
    pub articles: Vec<Article>,
    pub total_articles: usize,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    #[serde(rename = "qualityFilterEnabled")]
    pub quality_filter_enabled: bool,
    #[serde(rename = "minQualityScore")]
    pub min_quality_score: f64,
    #[serde(rename = "filteredOut")]
    pub filtered_out: usize,
}

#[derive(Debug, Serialize)]
pub struct CacheInfo {
    pub size: usize,
    pub ttl_seconds: u64,
    pub max_size: usize,
}

#[derive(Debug, Serialize)]
pub struct EngineConstants {
    #[serde(rename = "MAX_RECENT_DAYS")]
    pub max_recent_days: i64,
    #[serde(rename = "DEFAULT_ARTICLE_COUNT")]
    pub default_article_count: usize,
    #[serde(rename = "MIN_ARTICLES_THRESHOLD")]
    pub min_articles_threshold: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub configured_domains: usize,
    pub priority_sites: usize,
    pub cache: CacheInfo,
    pub constants: EngineConstants,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

/// Value stored in the request cache. Degraded results are never stored, so
/// a cache hit always replays a full-quality response.
#[derive(Debug, Clone)]
pub enum CachedPayload {
    Articles {
        source_used: String,
        articles: Vec<Article>,
    },
    TopNews {
        sources_used: Vec<String>,
        articles: Vec<Article>,
        total_articles: usize,
        filtered_out: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_serde_names() {
        let s: Source =
            serde_json::from_str(r#"{"type":"google_news","url":"https://x.y/rss","priority":2}"#)
                .unwrap();
        assert_eq!(s.kind, SourceKind::GoogleNews);
        assert_eq!(s.kind.label(), "google_news");
        assert_eq!(s.timeout_ms, None);
    }

    #[test]
    fn article_omits_unset_optionals() {
        let a = Article { title: "t".into(), url: "https://a.b/c".into(), ..Default::default() };
        let v = serde_json::to_value(&a).unwrap();
        assert!(v.get("published_at").is_none());
        assert!(v.get("quality_score").is_none());
        assert!(v.get("source_rank").is_none());
    }

    #[test]
    fn request_accepts_camel_case_days() {
        let r: ArticlesRequest =
            serde_json::from_str(r#"{"domain":"example.com","lastNDays":7}"#).unwrap();
        assert_eq!(r.last_n_days, Some(7));
    }
}
