mod config;
mod errors;
mod llm_client;
mod models;
mod opinions;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::GeminiClient;
use crate::opinions::catalog::ModelCatalog;
use crate::opinions::generation::GenerationClient;
use crate::opinions::prompts::PromptBuilder;
use crate::opinions::service::OpinionService;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Opinion API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize provider client
    let gemini = Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_api_base.clone(),
        config.generation_timeout,
    )?);
    info!("Gemini client initialized ({})", config.gemini_api_base);

    // Warm the model catalog before accepting traffic
    let catalog = Arc::new(ModelCatalog::new(gemini.clone()));
    let snapshot = catalog.refresh().await;
    if snapshot.degraded {
        warn!("Model catalog is degraded: serving the built-in model list");
    } else {
        info!("Model catalog ready: {} models", snapshot.models.len());
    }

    let prompts = match &config.prompt_path {
        Some(path) => PromptBuilder::from_file(path),
        None => PromptBuilder::default(),
    };

    let opinions = Arc::new(OpinionService::new(
        catalog.clone(),
        prompts,
        GenerationClient::new(gemini, config.generation_timeout),
    ));

    let state = AppState { catalog, opinions };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// CORS restricted to the configured origins. Unparseable origins are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{origin}'");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}
