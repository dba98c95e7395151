use axum::{
    routing::{get, post},
    Router,
};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rust_lead_intake_api::config::Config;
use rust_lead_intake_api::db::Database;
use rust_lead_intake_api::handlers::{self, AppState};
use rust_lead_intake_api::lead_storage::LeadStorage;
use rust_lead_intake_api::llm_mapper::LlmFieldMapper;
use rust_lead_intake_api::mapping_engine::MappingEngine;
use rust_lead_intake_api::webhook_handler;

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - Database connection.
/// - The field mapping engine (with the LLM layer when a key is configured).
/// - HTTP routes and middleware (CORS, tracing).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_lead_intake_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Initialize database connection pool
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    // LLM mapper is optional: without a key the engine stops at heuristics
    let remote = match config.llm_settings() {
        Some(settings) => match LlmFieldMapper::new(settings) {
            Ok(mapper) => {
                tracing::info!("✓ LLM field mapper initialized: {}", mapper.model());
                Some(mapper)
            }
            Err(e) => {
                tracing::error!("Failed to initialize LLM field mapper: {}", e);
                None
            }
        },
        None => None,
    };
    let engine = MappingEngine::new(remote, config.mapping_timeout());

    // Mapping suggestions per (source, payload shape), 1 hour TTL
    let suggestion_cache = Cache::builder()
        .time_to_live(Duration::from_secs(3600))
        .max_capacity(10_000)
        .build();
    tracing::info!("Mapping suggestion cache initialized (1h TTL, 10k capacity)");

    let app_state = Arc::new(AppState {
        storage: LeadStorage::new(db.pool.clone()),
        engine,
        suggestion_cache,
    });

    let app = Router::new()
        .route("/health", get(handlers::health))
        // Inbound lead webhooks (one token per lead source)
        .route(
            "/api/v1/webhooks/leads/:token",
            post(webhook_handler::receive_lead).get(webhook_handler::test_webhook),
        )
        .route(
            "/api/v1/lead-sources/:id/suggest-mapping",
            post(handlers::suggest_mapping),
        )
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        );

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
