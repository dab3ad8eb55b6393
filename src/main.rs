//! Westfield Brand Assistant
//!
//! A chat server that answers shopping-centre questions through an `OpenAI`
//! chat-completion model, one isolated conversation per browser session.

mod api;
mod config;
mod llm;
mod runtime;
mod session;
mod state_machine;
mod system_prompt;
mod transcript;

use api::{create_router, AppState};
use config::AppConfig;
use llm::{LlmConfig, DEFAULT_TEMPERATURE};
use runtime::RuntimeManager;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; real environment variables still apply
    let dotenv = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brand_assistant=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    if let Ok(path) = dotenv {
        tracing::info!(path = %path.display(), "Loaded .env");
    }

    // Configuration
    let config = AppConfig::from_env();
    let llm_config = LlmConfig::from_env()?;

    let llm = llm::build_service(&llm_config)?;
    tracing::info!(
        model = %llm.model_id(),
        temperature = DEFAULT_TEMPERATURE,
        base_url = %llm_config.base_url,
        "Completion backend ready"
    );

    let runtime = Arc::new(RuntimeManager::new(llm));
    runtime.start_sweeper(config.sweep_interval(), config.session_idle);

    let state = AppState::new(runtime);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.addr();
    tracing::info!("Brand assistant listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
