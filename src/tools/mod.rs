//! The tool surface: four operations implemented over the engine, plus
//! their JSON schemas for MCP-style tool listings.

pub mod articles;
pub mod status;
pub mod top_news;

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::error;

use crate::core::error::{NexusError, Result};
use crate::core::AppState;

#[derive(Debug, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: serde_json::Value,
}

pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "get_articles",
            description: "Fetch recent articles for one publisher domain through the tiered source ladder (official RSS, RSSHub, Google News, scraper). Supports topic, location, date-window, and count filters.",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "domain": {
                        "type": "string",
                        "description": "Publisher domain, e.g. 'thehindu.com'"
                    },
                    "topic": {
                        "type": "string",
                        "description": "Topic key (e.g. 'ai', 'cricket') expanded through the keyword dictionary"
                    },
                    "location": {
                        "type": "string",
                        "description": "Location keyword matched on word boundaries"
                    },
                    "lastNDays": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 365,
                        "description": "Date window in days (default 15)"
                    },
                    "count": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 100,
                        "default": 10,
                        "description": "Maximum number of articles to return"
                    }
                },
                "required": ["domain"]
            }),
        },
        ToolSpec {
            name: "get_top_news",
            description: "Aggregate top news across the configured priority publishers (or an explicit domain list) with deduplication, quality scoring, and per-domain diversity.",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "count": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 100,
                        "default": 10
                    },
                    "topic": { "type": "string" },
                    "location": { "type": "string" },
                    "lastNDays": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 365
                    },
                    "domains": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Restrict aggregation to these publisher domains (fuzzy matched)"
                    },
                    "min_quality_score": {
                        "type": "number",
                        "minimum": 0,
                        "maximum": 100,
                        "default": 35
                    },
                    "enable_quality_filter": {
                        "type": "boolean",
                        "default": true
                    }
                }
            }),
        },
        ToolSpec {
            name: "health_check",
            description: "Service liveness, configured sites, cache occupancy, and engine constants.",
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
        },
        ToolSpec {
            name: "get_metrics",
            description: "Request counters, latency histograms with percentiles, and process uptime.",
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
        },
    ]
}

fn parse_args<T: serde::de::DeserializeOwned>(args: serde_json::Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| NexusError::BadInput(format!("arguments: {}", e)))
}

/// Execute a tool by name. Counts every call and error kind, and records
/// per-operation latency.
pub async fn dispatch(
    state: &Arc<AppState>,
    name: &str,
    args: serde_json::Value,
) -> Result<serde_json::Value> {
    let started = Instant::now();
    state.metrics.incr("requests_total");
    state.metrics.incr(&format!("requests_{}", name));

    let result = match name {
        "get_articles" => {
            let req = parse_args(args)?;
            articles::get_articles(state, req).await.and_then(|r| {
                serde_json::to_value(r).map_err(|e| NexusError::Internal(e.to_string()))
            })
        }
        "get_top_news" => {
            let req = parse_args(args)?;
            top_news::get_top_news(state, req).await.and_then(|r| {
                serde_json::to_value(r).map_err(|e| NexusError::Internal(e.to_string()))
            })
        }
        "health_check" => serde_json::to_value(status::health_check(state))
            .map_err(|e| NexusError::Internal(e.to_string())),
        "get_metrics" => Ok(status::get_metrics(state)),
        other => Err(NexusError::BadInput(format!("unknown tool: {}", other))),
    };

    state
        .metrics
        .observe_ms(&format!("{}_ms", name), started.elapsed().as_millis() as f64);
    if let Err(e) = &result {
        state.metrics.incr(&format!("errors_{}", e.code()));
        error!(tool = name, code = e.code(), error = %e, "tool call failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_tools_are_exposed() {
        let names: Vec<&str> = tool_specs().iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["get_articles", "get_top_news", "health_check", "get_metrics"]);
    }

    #[test]
    fn schemas_declare_required_domain() {
        let specs = tool_specs();
        let articles = &specs[0];
        assert_eq!(articles.input_schema["required"][0], "domain");
        assert_eq!(articles.input_schema["properties"]["count"]["maximum"], 100);
    }
}
