use crate::errors::AppError;
use crate::handlers::AppState;
use crate::lead_storage::LeadStorage;
use crate::models::{LeadSource, LeadSourceSummary, LeadWebhookResponse, NewLead};
use crate::validation;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Lead Webhook Handler
///
/// Receives leads from external sources (WordPress, WooCommerce, Shopify,
/// Zapier, ...). The token in the URL identifies the lead source.
///
/// Flow:
/// 1. Resolve the lead source by token (401 if unknown, 403 if disabled).
/// 2. Parse the body as JSON (400 if it is not).
/// 3. Map the payload to a contact (manual → heuristic → LLM).
/// 4. Validate the contact (400 with details on failure).
/// 5. Store the lead with the raw payload and bump source statistics.
pub async fn receive_lead(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<LeadWebhookResponse>), AppError> {
    let source = find_active_source(&state.storage, &token).await?;

    tracing::info!(
        "📨 Received lead webhook for source {} ({})",
        source.id,
        source.source_type
    );

    let payload = parse_payload(&body)?;

    let mapping_config = source.mapping_config();
    let outcome = state
        .engine
        .resolve_traced(&payload, mapping_config.as_ref())
        .await;

    tracing::debug!(
        "Mapped webhook payload via {} layer: {:?}",
        outcome.layer,
        outcome.contact
    );

    let check = validation::validate(&outcome.contact);
    if !check.valid {
        tracing::warn!(
            "❌ Rejected lead for source {}: {}",
            source.id,
            check.errors.join(", ")
        );
        return Err(AppError::ValidationFailed {
            message: "Invalid lead data".to_string(),
            details: check.errors,
        });
    }

    let lead = NewLead::from_webhook(&source, outcome.contact, payload);
    let lead_id = state.storage.insert_lead(&lead).await?;

    // The lead is already stored; a stale counter must not fail the delivery
    if let Err(e) = state.storage.record_lead_received(source.id).await {
        tracing::error!("Failed to update statistics for source {}: {}", source.id, e);
    }

    tracing::info!(
        "✅ Lead {} created from source {} ({} mapping)",
        lead_id,
        source.id,
        outcome.layer
    );

    Ok((
        StatusCode::CREATED,
        Json(LeadWebhookResponse {
            success: true,
            lead_id,
            message: "Lead received successfully".to_string(),
            mapping_layer: outcome.layer.to_string(),
        }),
    ))
}

/// GET /api/v1/webhooks/leads/:token
///
/// Lets integrators check that a webhook URL is wired correctly.
/// Disabled sources are still reported (with `isActive: false`).
pub async fn test_webhook(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<Value>, AppError> {
    let source = state
        .storage
        .find_source_by_token(&token)
        .await?
        .ok_or_else(invalid_token)?;

    Ok(Json(json!({
        "success": true,
        "message": "Webhook is configured correctly",
        "source": LeadSourceSummary::from(&source),
    })))
}

async fn find_active_source(storage: &LeadStorage, token: &str) -> Result<LeadSource, AppError> {
    let source = storage
        .find_source_by_token(token)
        .await?
        .ok_or_else(invalid_token)?;

    if !source.is_active {
        return Err(AppError::Forbidden("Lead source is disabled".to_string()));
    }

    Ok(source)
}

fn invalid_token() -> AppError {
    AppError::Unauthorized("Invalid webhook token".to_string())
}

/// Parses the raw body. Any well-formed JSON is accepted; shape is the
/// mapping engine's concern.
fn parse_payload(body: &[u8]) -> Result<Value, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!("Webhook body is not valid JSON: {}", e);
        AppError::BadRequest("Invalid JSON payload".to_string())
    })
}
