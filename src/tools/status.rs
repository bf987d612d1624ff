use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::core::config::{DEFAULT_ARTICLE_COUNT, MAX_RECENT_DAYS, MIN_ARTICLES_THRESHOLD};
use crate::core::types::{CacheInfo, EngineConstants, HealthResponse};
use crate::core::AppState;

pub fn health_check(state: &Arc<AppState>) -> HealthResponse {
    HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        configured_domains: state.config.sites.len(),
        priority_sites: state.config.priority_sites().len(),
        cache: CacheInfo {
            size: state.cache.len(),
            ttl_seconds: state.cache.ttl_seconds(),
            max_size: state.cache.capacity(),
        },
        constants: EngineConstants {
            max_recent_days: MAX_RECENT_DAYS,
            default_article_count: DEFAULT_ARTICLE_COUNT,
            min_articles_threshold: MIN_ARTICLES_THRESHOLD,
        },
        timestamp: Utc::now().to_rfc3339(),
    }
}

pub fn get_metrics(state: &Arc<AppState>) -> serde_json::Value {
    json!({
        "metrics": state.metrics.snapshot(),
        "timestamp": Utc::now().to_rfc3339(),
    })
}
