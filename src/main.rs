//! NEXUS - conversational leadership co-pilot
//!
//! A Rust backend driving a per-session turn controller over a generative
//! text backend and an image backend, served over HTTP with SSE updates.

mod advisors;
mod api;
mod config;
mod contexts;
mod directive;
mod llm;
mod locale;
mod markdown;
mod runtime;
mod state_machine;
mod system_prompt;
mod timeline;

use advisors::AdvisorGallery;
use api::{create_router, AppState};
use config::ServerConfig;
use llm::Backends;
use runtime::SessionManager;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nexus=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = ServerConfig::from_env()?;
    let contexts = Arc::new(config.load_contexts()?);
    tracing::info!(
        contexts = contexts.list(locale::Locale::DEFAULT).len(),
        custom = config.contexts_path.is_some(),
        "Context table loaded"
    );

    // Backends
    let backends = Backends::from_config(&config.llm);
    if backends.is_configured() {
        tracing::info!(
            text_model = %backends.text.model_id(),
            image_model = %backends.image.model_id(),
            "Generative backends initialized"
        );
    } else {
        tracing::warn!("No Gemini credentials configured. Set GEMINI_API_KEY or LLM_GATEWAY.");
    }

    // Advisor portraits load in the background
    let advisors = Arc::new(AdvisorGallery::new());
    {
        let advisors = advisors.clone();
        let image = backends.image.clone();
        tokio::spawn(async move {
            advisors.load(image.as_ref()).await;
        });
    }

    // Create application state
    let sessions = SessionManager::new(backends, contexts, config.aspect_ratio);
    let state = AppState::new(sessions, advisors);

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
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    tracing::info!("NEXUS server listening on {}", config.bind);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
