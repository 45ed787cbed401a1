mod agents;
mod config;
mod document;
mod errors;
mod jsearch;
mod llm_client;
mod pipeline;
mod routes;
mod state;
mod web_search;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::agents::ToolRegistry;
use crate::config::Config;
use crate::jsearch::JSearchClient;
use crate::llm_client::LlmClient;
use crate::pipeline::Coordinator;
use crate::routes::build_router;
use crate::state::AppState;
use crate::web_search::WebSearchClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on a missing model key)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Advisor API v{}", env!("CARGO_PKG_VERSION"));

    // Shared HTTP client for the search APIs; per-request timeouts are set by each client
    let http = reqwest::Client::builder().build()?;

    let jsearch = JSearchClient::new(http.clone(), config.jsearch.clone());
    if config.jsearch.api_key.is_none() {
        warn!("RAPIDAPI_KEY not set; salary and job search will return error records");
    }
    let web = WebSearchClient::new(http, config.web_search.clone());

    // Initialize LLM client
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        config.anthropic_api_url.clone(),
        config.llm_timeout,
    )?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let registry = ToolRegistry::standard(jsearch.clone(), web);
    let coordinator = Coordinator::new(Arc::new(llm), &registry, config.pipeline.clone());
    info!(
        "Pipeline stages: {:?} (max {} tool rounds, strict JSON: {})",
        coordinator.stages(),
        config.pipeline.max_tool_iterations,
        config.pipeline.strict_json
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        coordinator: Arc::new(coordinator),
        jsearch,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
