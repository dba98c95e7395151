use crate::errors::{AppError, ResultExt};
use crate::models::{LeadSource, NewLead};
use sqlx::PgPool;
use uuid::Uuid;

const LEAD_SOURCE_COLUMNS: &str = r#"
    id,
    organization_id,
    name,
    type AS source_type,
    webhook_token,
    is_active,
    field_mapping,
    total_leads_received,
    last_lead_received_at
"#;

/// Persistence for lead sources and accepted leads.
///
/// Every lead is written with its source's `organization_id`, which scopes
/// it to a single tenant.
#[derive(Clone)]
pub struct LeadStorage {
    pool: PgPool,
}

impl LeadStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Looks up the lead source owning a webhook token.
    pub async fn find_source_by_token(&self, token: &str) -> Result<Option<LeadSource>, AppError> {
        let query = format!(
            "SELECT {} FROM lead_sources WHERE webhook_token = $1 LIMIT 1",
            LEAD_SOURCE_COLUMNS
        );

        sqlx::query_as::<_, LeadSource>(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to look up lead source by webhook token")
    }

    pub async fn find_source_by_id(&self, id: Uuid) -> Result<Option<LeadSource>, AppError> {
        let query = format!(
            "SELECT {} FROM lead_sources WHERE id = $1 LIMIT 1",
            LEAD_SOURCE_COLUMNS
        );

        sqlx::query_as::<_, LeadSource>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to load lead source {}", id))
    }

    /// Inserts an accepted lead (with its raw payload) and returns its id.
    pub async fn insert_lead(&self, lead: &NewLead) -> Result<Uuid, AppError> {
        let lead_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO leads (
                organization_id,
                source_id,
                source_type,
                first_name,
                last_name,
                email,
                phone,
                company,
                status,
                lead_score,
                temperature,
                raw_data,
                consent_to_call,
                consent_to_email,
                do_not_contact
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING id
            "#,
        )
        .bind(lead.organization_id)
        .bind(lead.source_id)
        .bind(&lead.source_type)
        .bind(&lead.contact.first_name)
        .bind(&lead.contact.last_name)
        .bind(&lead.contact.email)
        .bind(&lead.contact.phone)
        .bind(&lead.contact.company)
        .bind(&lead.status)
        .bind(lead.lead_score)
        .bind(&lead.temperature)
        .bind(&lead.raw_data)
        .bind(lead.consent_to_call)
        .bind(lead.consent_to_email)
        .bind(lead.do_not_contact)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert lead")?;

        tracing::debug!(
            "Stored lead {} for organization {}",
            lead_id,
            lead.organization_id
        );
        Ok(lead_id)
    }

    /// Bumps the received counter and last-received timestamp of a source.
    pub async fn record_lead_received(&self, source_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE lead_sources
            SET total_leads_received = COALESCE(total_leads_received, 0) + 1,
                last_lead_received_at = now(),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(source_id)
        .execute(&self.pool)
        .await
        .context("Failed to update lead source statistics")?;

        if result.rows_affected() == 0 {
            tracing::warn!(
                "No lead source found to update statistics: source_id={}",
                source_id
            );
        }

        Ok(())
    }
}
