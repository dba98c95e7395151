use crate::errors::AppError;
use crate::fingerprint::mapping_cache_key;
use crate::lead_storage::LeadStorage;
use crate::mapping_engine::MappingEngine;
use crate::models::FieldMappingConfig;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use moka::future::Cache;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Lead and lead-source persistence.
    pub storage: LeadStorage,
    /// Field mapping pipeline (remote layer present only with a model credential).
    pub engine: MappingEngine,
    /// Suggested mappings keyed by source and payload shape (see `fingerprint`).
    pub suggestion_cache: Cache<String, FieldMappingConfig>,
}

/// Health check endpoint.
///
/// Returns the service status, version, and whether LLM mapping is enabled.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-lead-intake-api",
            "version": env!("CARGO_PKG_VERSION"),
            "llmMapping": state.engine.remote().is_some()
        })),
    )
}

/// POST /api/v1/lead-sources/:id/suggest-mapping
///
/// Asks the model for a manual field mapping that fits the posted sample
/// payload. Suggestions are cached per source and payload shape, so repeated
/// samples from the same integration do not trigger new model calls.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `source_id` - Lead source the mapping is meant for.
/// * `sample` - A representative webhook payload.
///
/// # Returns
///
/// * `Result<Json<FieldMappingConfig>, AppError>` - The suggested mapping (possibly empty).
pub async fn suggest_mapping(
    State(state): State<Arc<AppState>>,
    Path(source_id): Path<Uuid>,
    Json(sample): Json<Value>,
) -> Result<Json<FieldMappingConfig>, AppError> {
    let mapper = state.engine.remote().ok_or_else(|| {
        AppError::ServiceUnavailable("LLM field mapping is not configured".to_string())
    })?;

    let source = state
        .storage
        .find_source_by_id(source_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lead source {} not found", source_id)))?;

    let cache_key = mapping_cache_key(&source.id.to_string(), &sample);
    if let Some(cached) = state.suggestion_cache.get(&cache_key).await {
        tracing::debug!("Mapping suggestion cache hit: {}", cache_key);
        return Ok(Json(cached));
    }

    tracing::info!("Generating mapping suggestion for source {}", source.id);
    let suggestion = mapper.suggest_mapping(&sample).await;

    // Empty suggestions usually mean the model call failed; don't pin them
    if !suggestion.is_empty() {
        state
            .suggestion_cache
            .insert(cache_key, suggestion.clone())
            .await;
    }

    Ok(Json(suggestion))
}
