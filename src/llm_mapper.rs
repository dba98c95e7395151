//! Remote field mapping through an OpenAI-compatible chat completion API
//! (OpenRouter by default).
//!
//! Used as the last resort when heuristics cannot find an email or phone.
//! Every public operation is infallible: transport, status and parse
//! failures are logged and folded into an empty, zero-confidence result.

use crate::errors::AppError;
use crate::models::{FieldMappingConfig, MappingResult, ResolvedContact};
use crate::nested_path::field_text;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Low temperature keeps the extraction close to deterministic.
pub const MAPPING_TEMPERATURE: f32 = 0.1;
pub const MAPPING_MAX_TOKENS: u32 = 500;
pub const SUGGESTION_MAX_TOKENS: u32 = 300;
/// Substituted when the model reports a missing or out-of-range confidence.
pub const DEFAULT_CONFIDENCE: u8 = 50;

/// Connection settings for the model provider.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// API root, without trailing slash (e.g. `https://openrouter.ai/api/v1`).
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Value of the `HTTP-Referer` header.
    pub referer: String,
    /// Value of the `X-Title` header.
    pub title: String,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Client for model-assisted field mapping.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct LlmFieldMapper {
    client: Client,
    settings: LlmSettings,
}

impl LlmFieldMapper {
    /// Creates a new `LlmFieldMapper`.
    ///
    /// # Arguments
    ///
    /// * `settings` - Provider URL, credential, model and request timeout.
    pub fn new(settings: LlmSettings) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create LLM client: {}", e))
            })?;

        Ok(Self { client, settings })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Maps an arbitrary webhook payload to a contact.
    ///
    /// Issues exactly one request. Never fails: any error yields
    /// [`MappingResult::failed`].
    pub async fn map_fields(&self, payload: &Value) -> MappingResult {
        let prompt = build_mapping_prompt(payload);

        let outcome = match self.complete(prompt, MAPPING_MAX_TOKENS).await {
            Ok(content) => parse_mapping_result(&content),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => {
                tracing::debug!(
                    "LLM mapping returned confidence {}: {}",
                    result.confidence,
                    result.reasoning
                );
                result
            }
            Err(e) => {
                tracing::warn!("LLM field mapping failed: {}", e);
                MappingResult::failed()
            }
        }
    }

    /// Proposes a manual mapping (dot paths) for payloads shaped like `sample`.
    ///
    /// Returns an empty config on any failure.
    pub async fn suggest_mapping(&self, sample: &Value) -> FieldMappingConfig {
        let prompt = build_suggestion_prompt(sample);

        let outcome = match self.complete(prompt, SUGGESTION_MAX_TOKENS).await {
            Ok(content) => parse_suggested_mapping(&content),
            Err(e) => Err(e),
        };

        outcome.unwrap_or_else(|e| {
            tracing::warn!("LLM mapping suggestion failed: {}", e);
            FieldMappingConfig::default()
        })
    }

    /// Sends a single user-role prompt and returns the completion text.
    async fn complete(&self, prompt: String, max_tokens: u32) -> Result<String, AppError> {
        let url = format!("{}/chat/completions", self.settings.base_url);
        let body = ChatCompletionRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: MAPPING_TEMPERATURE,
            max_tokens,
        };

        tracing::info!("Requesting LLM completion from {}", self.settings.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .header("HTTP-Referer", &self.settings.referer)
            .header("X-Title", &self.settings.title)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("LLM request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "LLM provider returned {}: {}",
                status, error_text
            )));
        }

        let data: ChatCompletionResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse LLM response: {}", e))
        })?;

        data.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AppError::ExternalApiError("No response from LLM".to_string()))
    }
}

fn build_mapping_prompt(payload: &Value) -> String {
    let payload_json =
        serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());

    format!(
        r#"You map webhook and API payloads to a standard lead record.

Webhook payload:
{payload_json}

Find these fields if they exist:
- email (email address)
- phone (phone number)
- firstName (first name)
- lastName (last name)
- company (company or organization name)

Rules:
1. Match field names by meaning, ignoring case and separators.
2. Look inside nested objects too (e.g. contact.email, user.profile.name).
3. If only a full name is present, split it into firstName and lastName.
4. Return the values themselves, not the paths where you found them.

Respond with a single JSON object of exactly this shape:
{{
  "email": "value or null",
  "phone": "value or null",
  "firstName": "value or null",
  "lastName": "value or null",
  "company": "value or null",
  "confidence": 0-100,
  "reasoning": "one short sentence"
}}

Example payload:
{{
  "customer": {{
    "contact_email": "john@example.com",
    "full_name": "John Doe"
  }},
  "org": "Acme Corp"
}}

Example response:
{{
  "email": "john@example.com",
  "phone": null,
  "firstName": "John",
  "lastName": "Doe",
  "company": "Acme Corp",
  "confidence": 95,
  "reasoning": "Email in customer.contact_email, full_name split into first and last name, company in org"
}}"#
    )
}

fn build_suggestion_prompt(sample: &Value) -> String {
    let sample_json = serde_json::to_string_pretty(sample).unwrap_or_else(|_| sample.to_string());

    format!(
        r#"You design field mappings from webhook payloads to a standard lead record.

Sample payload:
{sample_json}

Return ONLY a JSON object mapping lead fields to dot-notation paths in the payload
(e.g. "customer.email" or "user.profile.phone"):
{{
  "email": "path.to.email",
  "phone": "path.to.phone",
  "firstName": "path.to.first.name",
  "lastName": "path.to.last.name",
  "company": "path.to.company"
}}

Omit any field that does not exist in the sample.

Example payload:
{{
  "customer": {{
    "contact_email": "john@example.com",
    "details": {{ "phone": "+1234567890" }}
  }},
  "business_name": "Acme Corp"
}}

Example response:
{{
  "email": "customer.contact_email",
  "phone": "customer.details.phone",
  "company": "business_name"
}}"#
    )
}

/// Finds the first balanced `{...}` span in `text` that parses as a JSON object.
///
/// Models often wrap JSON in prose or code fences, so the whole completion
/// cannot be parsed directly. Braces inside string literals are ignored.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    text.char_indices()
        .filter(|(_, ch)| *ch == '{')
        .filter_map(|(start, _)| balanced_span(&text[start..]))
        .find_map(|span| serde_json::from_str::<Map<String, Value>>(span).ok())
}

/// The prefix of `text` (which starts with `{`) up to its matching `}`.
fn balanced_span(text: &str) -> Option<&str> {
    let mut depth = 0u32;
    let mut in_string = false;
    let mut escape = false;

    for (i, ch) in text.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parses a completion into a [`MappingResult`].
pub fn parse_mapping_result(content: &str) -> Result<MappingResult, AppError> {
    let object = extract_json_object(content).ok_or_else(|| {
        AppError::ExternalApiError("Could not parse JSON from LLM response".to_string())
    })?;

    let field = |key: &str| {
        object
            .get(key)
            .and_then(field_text)
            .filter(|value| !value.eq_ignore_ascii_case("null"))
    };

    Ok(MappingResult {
        contact: ResolvedContact {
            email: field("email"),
            phone: field("phone"),
            first_name: field("firstName"),
            last_name: field("lastName"),
            company: field("company"),
        },
        confidence: normalize_confidence(object.get("confidence")),
        reasoning: object
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

/// Confidence in [0, 100], truncated so fractions never reach the next
/// whole percent; anything else becomes [`DEFAULT_CONFIDENCE`].
fn normalize_confidence(value: Option<&Value>) -> u8 {
    match value.and_then(Value::as_f64) {
        Some(c) if (0.0..=100.0).contains(&c) => c.floor() as u8,
        _ => {
            tracing::debug!("LLM confidence missing or out of range: {:?}", value);
            DEFAULT_CONFIDENCE
        }
    }
}

/// Parses a suggested mapping. Suggestions are always manual mappings.
pub fn parse_suggested_mapping(content: &str) -> Result<FieldMappingConfig, AppError> {
    let object = extract_json_object(content).ok_or_else(|| {
        AppError::ExternalApiError("Could not parse JSON from LLM response".to_string())
    })?;

    let mut config = FieldMappingConfig::from_json(&Value::Object(object)).unwrap_or_default();
    config.auto_detect = false;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_json_from_prose() {
        let text = "Sure! Here is the mapping:\n```json\n{\"email\": \"a@b.com\", \"confidence\": 90}\n```\nLet me know.";
        let object = extract_json_object(text).unwrap();
        assert_eq!(object.get("email"), Some(&json!("a@b.com")));
    }

    #[test]
    fn test_extract_ignores_braces_in_strings() {
        let text = r#"{"reasoning": "found } in text", "nested": {"a": 1}} trailing {"#;
        let object = extract_json_object(text).unwrap();
        assert_eq!(object.get("reasoning"), Some(&json!("found } in text")));
        assert_eq!(object.get("nested"), Some(&json!({"a": 1})));
    }

    #[test]
    fn test_extract_skips_malformed_leading_span() {
        let text = r#"Template {field: value} then {"email": "x@y.com"}"#;
        let object = extract_json_object(text).unwrap();
        assert_eq!(object.get("email"), Some(&json!("x@y.com")));
    }

    #[test]
    fn test_extract_none_without_object() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("{\"unterminated\": true").is_none());
    }

    #[test]
    fn test_parse_mapping_result_nulls_are_absent() {
        let content = r#"{"email": "z@w.com", "phone": null, "firstName": "null", "lastName": "", "company": "Acme", "confidence": 88, "reasoning": "ok"}"#;
        let result = parse_mapping_result(content).unwrap();

        assert_eq!(result.contact.email.as_deref(), Some("z@w.com"));
        assert_eq!(result.contact.phone, None);
        assert_eq!(result.contact.first_name, None);
        assert_eq!(result.contact.last_name, None);
        assert_eq!(result.contact.company.as_deref(), Some("Acme"));
        assert_eq!(result.confidence, 88);
        assert_eq!(result.reasoning, "ok");
    }

    #[test]
    fn test_invalid_confidence_defaults_to_fifty() {
        for confidence in [json!(150), json!(-3), json!("high"), json!(null)] {
            let content = json!({"email": "a@b.com", "confidence": confidence}).to_string();
            assert_eq!(
                parse_mapping_result(&content).unwrap().confidence,
                DEFAULT_CONFIDENCE
            );
        }

        let missing = parse_mapping_result(r#"{"email": "a@b.com"}"#).unwrap();
        assert_eq!(missing.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_fractional_confidence_truncates() {
        for (raw, expected) in [("69.5", 69), ("69.99", 69), ("70.0", 70), ("99.9", 99)] {
            let content = format!(r#"{{"confidence": {}}}"#, raw);
            assert_eq!(parse_mapping_result(&content).unwrap().confidence, expected);
        }
    }

    #[test]
    fn test_parse_mapping_result_without_json_fails() {
        assert!(parse_mapping_result("I could not find anything").is_err());
    }

    #[test]
    fn test_parse_suggested_mapping() {
        let content = r#"Mapping: {"email": "customer.contact_email", "phone": "customer.details.phone", "autoDetect": true}"#;
        let config = parse_suggested_mapping(content).unwrap();

        assert!(!config.auto_detect);
        assert_eq!(config.email.as_deref(), Some("customer.contact_email"));
        assert_eq!(config.phone.as_deref(), Some("customer.details.phone"));
        assert_eq!(config.company, None);
    }

    #[test]
    fn test_mapping_prompt_embeds_payload() {
        let prompt = build_mapping_prompt(&json!({"contact": {"mail": "q@r.com"}}));
        assert!(prompt.contains("\"mail\": \"q@r.com\""));
        assert!(prompt.contains("\"confidence\": 0-100"));
    }
}
