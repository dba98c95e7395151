use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

// ============ Database Models ============

/// A configured inbound lead source (WordPress, Shopify, Zapier, generic webhook...).
///
/// Each source owns a unique webhook token and, optionally, a manual field mapping.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LeadSource {
    /// Unique identifier for the source.
    pub id: Uuid,
    /// Owning organization (tenant).
    pub organization_id: Uuid,
    /// Display name.
    pub name: String,
    /// Source kind (e.g., "webhook", "wordpress", "zapier").
    pub source_type: String,
    /// Secret token embedded in the webhook URL.
    pub webhook_token: String,
    /// Disabled sources reject deliveries with 403.
    pub is_active: bool,
    /// Raw field mapping configuration as stored (JSONB).
    pub field_mapping: Option<Value>,
    /// Number of leads accepted from this source.
    pub total_leads_received: Option<i32>,
    /// When the last lead was accepted.
    pub last_lead_received_at: Option<DateTime<Utc>>,
}

impl LeadSource {
    /// Parses the stored JSONB mapping, tolerating malformed content.
    pub fn mapping_config(&self) -> Option<FieldMappingConfig> {
        self.field_mapping
            .as_ref()
            .and_then(FieldMappingConfig::from_json)
    }
}

/// Lead record ready to be inserted, built from a resolved contact.
#[derive(Debug, Clone)]
pub struct NewLead {
    pub organization_id: Uuid,
    pub source_id: Uuid,
    pub source_type: String,
    pub contact: ResolvedContact,
    pub status: String,
    pub lead_score: i32,
    pub temperature: String,
    /// Original webhook payload, kept for audit.
    pub raw_data: Value,
    pub consent_to_call: bool,
    pub consent_to_email: bool,
    pub do_not_contact: bool,
}

impl NewLead {
    /// New, cold, unscored lead with no consents recorded.
    pub fn from_webhook(source: &LeadSource, contact: ResolvedContact, raw_data: Value) -> Self {
        Self {
            organization_id: source.organization_id,
            source_id: source.id,
            source_type: source.source_type.clone(),
            contact,
            status: "new".to_string(),
            lead_score: 0,
            temperature: "cold".to_string(),
            raw_data,
            consent_to_call: false,
            consent_to_email: false,
            do_not_contact: false,
        }
    }
}

// ============ Mapping Models ============

/// Per-source manual field mapping.
///
/// Every path is a dot-separated key chain into the webhook payload
/// (e.g., `"customer.contact.email"`). When `auto_detect` is set, the paths
/// are ignored and the heuristic/remote layers decide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMappingConfig {
    #[serde(default)]
    pub auto_detect: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

impl FieldMappingConfig {
    /// Lenient parse of a stored mapping.
    ///
    /// Returns `None` when the value is not an object. Non-string or empty
    /// paths are dropped individually instead of failing the whole config;
    /// other paths are kept exactly as stored. `autoDetect` follows JSON
    /// truthiness, so `"true"` or `1` enable it just like `true`.
    pub fn from_json(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let path = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
        };

        Some(Self {
            auto_detect: map.get("autoDetect").is_some_and(is_truthy),
            first_name: path("firstName"),
            last_name: path("lastName"),
            email: path("email"),
            phone: path("phone"),
            company: path("company"),
        })
    }

    /// True when no path is configured.
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.company.is_none()
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Canonical contact extracted from a webhook payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

impl ResolvedContact {
    /// Email or phone present: the contact can be reached.
    pub fn has_identifier(&self) -> bool {
        self.email.is_some() || self.phone.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_identifier()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.company.is_none()
    }
}

/// Output of the remote model layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingResult {
    pub contact: ResolvedContact,
    /// Self-reported certainty, 0-100.
    pub confidence: u8,
    /// Model's explanation; only logged.
    pub reasoning: String,
}

impl MappingResult {
    pub fn failed() -> Self {
        Self {
            contact: ResolvedContact::default(),
            confidence: 0,
            reasoning: "mapping failed".to_string(),
        }
    }
}

/// Result of validating a resolved contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<String>,
}

// ============ API Models ============

/// 201 body for an accepted webhook delivery.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadWebhookResponse {
    pub success: bool,
    pub lead_id: Uuid,
    pub message: String,
    /// Which layer produced the contact ("manual", "heuristic", "remote").
    pub mapping_layer: String,
}

/// Public view of a lead source returned by the webhook test endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSourceSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub is_active: bool,
    pub total_leads_received: i32,
    pub last_lead_received_at: Option<DateTime<Utc>>,
}

impl From<&LeadSource> for LeadSourceSummary {
    fn from(source: &LeadSource) -> Self {
        Self {
            id: source.id,
            name: source.name.clone(),
            source_type: source.source_type.clone(),
            is_active: source.is_active,
            total_leads_received: source.total_leads_received.unwrap_or(0),
            last_lead_received_at: source.last_lead_received_at,
        }
    }
}
