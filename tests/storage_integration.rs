use std::env;
use uuid::Uuid;

use rust_lead_intake_api::data::lead_storage::LeadStorage;
use rust_lead_intake_api::db::Database;
use rust_lead_intake_api::models::{NewLead, ResolvedContact};

/// Integration smoke test for lead storage.
/// Marked ignored to avoid running against production by accident; set TEST_DATABASE_URL to run.
/// Requires a `lead_sources` row whose webhook token is given in TEST_WEBHOOK_TOKEN.
#[tokio::test]
#[ignore]
async fn store_webhook_lead_smoke_test() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;
    let token = env::var("TEST_WEBHOOK_TOKEN")
        .map_err(|_| anyhow::anyhow!("Set TEST_WEBHOOK_TOKEN to run this test"))?;

    let db = Database::new(&db_url).await?;
    let storage = LeadStorage::new(db.pool.clone());

    let source = storage
        .find_source_by_token(&token)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("No lead source for TEST_WEBHOOK_TOKEN"))?;
    let before = source.total_leads_received.unwrap_or(0);

    // Unique address so repeated runs are easy to tell apart
    let email = format!("smoke-{}@example.com", Uuid::new_v4().simple());
    let contact = ResolvedContact {
        email: Some(email.clone()),
        first_name: Some("Smoke".to_string()),
        ..Default::default()
    };
    let lead = NewLead::from_webhook(&source, contact, serde_json::json!({ "email": email }));

    let lead_id = storage
        .insert_lead(&lead)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_ne!(lead_id, Uuid::nil());

    storage
        .record_lead_received(source.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let reloaded = storage
        .find_source_by_id(source.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("Lead source disappeared"))?;
    assert!(reloaded.total_leads_received.unwrap_or(0) > before);
    assert!(reloaded.last_lead_received_at.is_some());

    // Unknown tokens resolve to nothing
    let missing = storage
        .find_source_by_token(&format!("missing-{}", Uuid::new_v4()))
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert!(missing.is_none());

    Ok(())
}
