mod audit;
mod config;
mod errors;
mod insights;
mod llm_client;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::audit::store::AuditStore;
use crate::config::Config;
use crate::insights::InsightsClient;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Eco Audit API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize insights client
    let insights_config = config.insights();
    info!(
        "Insights client initialized ({}, timeout {:?}, max {} tag pages)",
        insights_config.base_url, insights_config.timeout, insights_config.max_tag_pages
    );
    let insights =
        InsightsClient::new(insights_config).context("Failed to build insights client")?;

    // Initialize LLM client
    let llm = LlmClient::new(config.llm()).context("Failed to build LLM client")?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Build app state
    let state = AppState {
        insights,
        llm: Arc::new(llm),
        audits: AuditStore::new(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
