//! Transport shell: REST endpoints, MCP tool listing/calls, and a minimal
//! JSON-RPC dispatcher. Everything here is a thin adapter over
//! [`crate::tools`]; no engine logic lives at this layer.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};

use crate::core::error::NexusError;
use crate::core::types::{ArticlesRequest, ErrorBody, TopNewsRequest};
use crate::core::AppState;
use crate::tools;

#[derive(Debug, Serialize)]
pub struct McpToolsResponse {
    pub tools: Vec<tools::ToolSpec>,
}

#[derive(Debug, Deserialize)]
pub struct McpCallRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct McpCallResponse {
    pub content: Vec<McpContent>,
    pub is_error: bool,
}

#[derive(Debug, Serialize)]
pub struct McpContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

fn error_status(err: &NexusError) -> StatusCode {
    match err {
        NexusError::BadInput(_) => StatusCode::BAD_REQUEST,
        NexusError::NoMatch(_) => StatusCode::NOT_FOUND,
        NexusError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        NexusError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
        NexusError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_reply(err: NexusError) -> (StatusCode, Json<ErrorBody>) {
    (error_status(&err), Json(ErrorBody { error: err.to_string(), code: err.code() }))
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::to_value(tools::status::health_check(&state)).unwrap_or_default())
}

pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(tools::status::get_metrics(&state))
}

pub async fn articles_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ArticlesRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorBody>)> {
    let args = serde_json::json!({
        "domain": request.domain,
        "topic": request.topic,
        "location": request.location,
        "lastNDays": request.last_n_days,
        "count": request.count,
    });
    tools::dispatch(&state, "get_articles", args).await.map(Json).map_err(error_reply)
}

pub async fn top_news_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TopNewsRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorBody>)> {
    let args = serde_json::to_value(TopNewsArgs::from(request)).unwrap_or_default();
    tools::dispatch(&state, "get_top_news", args).await.map(Json).map_err(error_reply)
}

/// Re-serialization shim so the REST body and the tool arguments stay the
/// same shape.
#[derive(Serialize)]
struct TopNewsArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(rename = "lastNDays", skip_serializing_if = "Option::is_none")]
    last_n_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_quality_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enable_quality_filter: Option<bool>,
}

impl From<TopNewsRequest> for TopNewsArgs {
    fn from(r: TopNewsRequest) -> Self {
        Self {
            count: r.count,
            topic: r.topic,
            location: r.location,
            last_n_days: r.last_n_days,
            domains: r.domains,
            min_quality_score: r.min_quality_score,
            enable_quality_filter: r.enable_quality_filter,
        }
    }
}

pub async fn list_tools() -> Json<McpToolsResponse> {
    Json(McpToolsResponse { tools: tools::tool_specs() })
}

pub async fn call_tool(
    State(state): State<Arc<AppState>>,
    Json(request): Json<McpCallRequest>,
) -> Json<McpCallResponse> {
    match tools::dispatch(&state, &request.name, request.arguments).await {
        Ok(value) => Json(McpCallResponse {
            content: vec![McpContent {
                content_type: "text".to_string(),
                text: serde_json::to_string_pretty(&value).unwrap_or_default(),
            }],
            is_error: false,
        }),
        Err(e) => Json(McpCallResponse {
            content: vec![McpContent {
                content_type: "text".to_string(),
                text: serde_json::json!({ "error": e.to_string(), "code": e.code() }).to_string(),
            }],
            is_error: true,
        }),
    }
}

pub async fn server_card(State(_state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let tools: Vec<serde_json::Value> = tools::tool_specs()
        .into_iter()
        .map(|spec| {
            serde_json::json!({
                "name": spec.name,
                "description": spec.description
            })
        })
        .collect();

    Json(serde_json::json!({
        "serverInfo": {
            "name": "NewsNexus",
            "version": env!("CARGO_PKG_VERSION")
        },
        "tools": tools,
        "resources": [],
        "prompts": []
    }))
}

/// Minimal JSON-RPC 2.0 endpoint covering `initialize`, `tools/list`, and
/// `tools/call`.
pub async fn rpc_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let id = request.get("id").cloned().unwrap_or(serde_json::Value::Null);
    let method = request.get("method").and_then(|m| m.as_str()).unwrap_or_default();

    match method {
        "initialize" => Json(serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "protocolVersion": "2025-11-05",
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": "NewsNexus",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }
        })),
        "tools/list" => Json(serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": { "tools": tools::tool_specs() }
        })),
        "tools/call" => {
            let params = request.get("params").cloned().unwrap_or_default();
            let name = params.get("name").and_then(|n| n.as_str()).unwrap_or_default().to_string();
            let arguments = params.get("arguments").cloned().unwrap_or_default();
            match tools::dispatch(&state, &name, arguments).await {
                Ok(value) => Json(serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": {
                        "content": [{ "type": "text", "text": value.to_string() }],
                        "isError": false
                    }
                })),
                Err(e) => Json(serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {
                        "code": -32000,
                        "message": e.to_string(),
                        "data": { "code": e.code() }
                    }
                })),
            }
        }
        _ => Json(serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32601, "message": "Method not found" }
        })),
    }
}
