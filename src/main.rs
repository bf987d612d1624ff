use std::env;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use newsnexus::config::{Config, EnvConfig};
use newsnexus::{mcp, AppState};

/// Listen port, in precedence order: `--port N` / `--port=N` on the command
/// line, then `NEWSNEXUS_PORT` or `PORT`, then 5050.
fn resolve_port() -> u16 {
    let args: Vec<String> = std::env::args().collect();
    let from_args = args.iter().enumerate().find_map(|(i, arg)| {
        let value = arg
            .strip_prefix("--port=")
            .map(str::to_string)
            .or_else(|| (arg.as_str() == "--port").then(|| args.get(i + 1).cloned()).flatten())?;
        value.trim().parse::<u16>().ok()
    });

    from_args
        .or_else(|| {
            ["NEWSNEXUS_PORT", "PORT"]
                .into_iter()
                .find_map(|key| std::env::var(key).ok()?.trim().parse::<u16>().ok())
        })
        .unwrap_or(5050)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| {
            env::var("LOG_LEVEL").map(tracing_subscriber::EnvFilter::new)
        })
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!("Starting NewsNexus server");

    let http_timeout = env::var("HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(30);
    let connect_timeout = env::var("HTTP_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(10);
    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(http_timeout))
        .connect_timeout(std::time::Duration::from_secs(connect_timeout))
        .build()?;

    let config = Config::load(EnvConfig::from_env())
        .map_err(|e| anyhow::anyhow!("configuration: {}", e))?;
    info!(
        sites = config.sites.len(),
        priority_sites = config.priority_sites().len(),
        "configuration loaded"
    );

    let state = Arc::new(AppState::new(http_client, config));

    let app = Router::new()
        .route("/", get(mcp::health_handler))
        .route("/health", get(mcp::health_handler))
        .route("/metrics", get(mcp::metrics_handler))
        .route("/articles", post(mcp::articles_handler))
        .route("/top_news", post(mcp::top_news_handler))
        .route("/.well-known/mcp/server-card.json", get(mcp::server_card))
        .route("/mcp", post(mcp::rpc_handler))
        .route("/mcp/tools", get(mcp::list_tools))
        .route("/mcp/call", post(mcp::call_tool))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let port = resolve_port();
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Address already in use: {}. Stop the existing process or run with --port {} (or set PORT/NEWSNEXUS_PORT).",
                bind_addr,
                port.saturating_add(1)
            )
        }
        Err(e) => return Err(e.into()),
    };
    info!("NewsNexus listening on http://{}", bind_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).ok();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                if let Some(ref mut s) = sigterm {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown signal received");
}
