//! Three-layer field mapping for inbound webhook payloads.
//!
//! Layers are tried in a fixed order and the first accepted candidate wins:
//!
//! 1. **Manual** - the source has a field mapping and `autoDetect` is off.
//!    Always accepted, even when every path misses.
//! 2. **Heuristic** - known top-level key names. Accepted when it finds an
//!    email or phone.
//! 3. **Remote** - the LLM mapper, only when a credential is configured.
//!    Accepted at confidence >= [`REMOTE_CONFIDENCE_THRESHOLD`] with an
//!    email or phone.
//!
//! When nothing is accepted the heuristic result is returned as-is.
use crate::heuristics;
use crate::llm_mapper::LlmFieldMapper;
use crate::models::{FieldMappingConfig, MappingResult, ResolvedContact};
use crate::nested_path::resolve_text;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Minimum self-reported confidence for trusting the remote layer.
pub const REMOTE_CONFIDENCE_THRESHOLD: u8 = 70;

/// Evaluation order of the mapping layers.
pub const LAYER_ORDER: [MappingLayer; 3] = [
    MappingLayer::Manual,
    MappingLayer::Heuristic,
    MappingLayer::Remote,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingLayer {
    Manual,
    Heuristic,
    Remote,
}

impl MappingLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingLayer::Manual => "manual",
            MappingLayer::Heuristic => "heuristic",
            MappingLayer::Remote => "remote",
        }
    }

    /// Acceptance predicate for a candidate produced by this layer.
    fn accepts(&self, candidate: &Candidate) -> bool {
        match self {
            MappingLayer::Manual => true,
            MappingLayer::Heuristic => candidate.contact.has_identifier(),
            MappingLayer::Remote => {
                candidate.confidence.unwrap_or(0) >= REMOTE_CONFIDENCE_THRESHOLD
                    && candidate.contact.has_identifier()
            }
        }
    }
}

impl fmt::Display for MappingLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved contact plus the layer that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingOutcome {
    pub contact: ResolvedContact,
    pub layer: MappingLayer,
}

struct Candidate {
    contact: ResolvedContact,
    confidence: Option<u8>,
}

/// Orchestrates the mapping layers.
///
/// `remote` is `None` when no model credential is configured, which
/// disables the third layer.
#[derive(Clone)]
pub struct MappingEngine {
    remote: Option<LlmFieldMapper>,
    remote_timeout: Duration,
}

impl MappingEngine {
    pub fn new(remote: Option<LlmFieldMapper>, remote_timeout: Duration) -> Self {
        Self {
            remote,
            remote_timeout,
        }
    }

    /// Engine with only the manual and heuristic layers.
    pub fn without_remote() -> Self {
        Self::new(None, Duration::from_secs(0))
    }

    pub fn remote(&self) -> Option<&LlmFieldMapper> {
        self.remote.as_ref()
    }

    pub async fn resolve_mapping(
        &self,
        payload: &Value,
        config: Option<&FieldMappingConfig>,
    ) -> ResolvedContact {
        self.resolve_traced(payload, config).await.contact
    }

    /// Runs the layers in [`LAYER_ORDER`], stopping at the first accepted candidate.
    pub async fn resolve_traced(
        &self,
        payload: &Value,
        config: Option<&FieldMappingConfig>,
    ) -> MappingOutcome {
        let mut heuristic_result = None;

        for layer in LAYER_ORDER {
            let Some(candidate) = self
                .run_layer(layer, payload, config, &mut heuristic_result)
                .await
            else {
                continue;
            };

            if layer.accepts(&candidate) {
                tracing::debug!("Field mapping resolved by {} layer", layer);
                return MappingOutcome {
                    contact: candidate.contact,
                    layer,
                };
            }

            if layer == MappingLayer::Remote {
                tracing::info!(
                    "LLM mapping rejected (confidence {}%, identifier present: {})",
                    candidate.confidence.unwrap_or(0),
                    candidate.contact.has_identifier()
                );
            }
        }

        MappingOutcome {
            contact: heuristic_result.unwrap_or_else(|| heuristics::detect(payload)),
            layer: MappingLayer::Heuristic,
        }
    }

    /// Produces a layer's candidate, or `None` when the layer does not apply.
    async fn run_layer(
        &self,
        layer: MappingLayer,
        payload: &Value,
        config: Option<&FieldMappingConfig>,
        heuristic_result: &mut Option<ResolvedContact>,
    ) -> Option<Candidate> {
        match layer {
            MappingLayer::Manual => {
                let config = config.filter(|c| !c.auto_detect)?;
                Some(Candidate {
                    contact: apply_manual_mapping(payload, config),
                    confidence: None,
                })
            }
            MappingLayer::Heuristic => {
                let contact = heuristics::detect(payload);
                *heuristic_result = Some(contact.clone());
                Some(Candidate {
                    contact,
                    confidence: None,
                })
            }
            MappingLayer::Remote => {
                let mapper = self.remote.as_ref()?;
                tracing::info!("Auto-detection found no email or phone, trying LLM mapping");
                let result = self.call_remote(mapper, payload).await;
                Some(Candidate {
                    contact: result.contact,
                    confidence: Some(result.confidence),
                })
            }
        }
    }

    async fn call_remote(&self, mapper: &LlmFieldMapper, payload: &Value) -> MappingResult {
        match tokio::time::timeout(self.remote_timeout, mapper.map_fields(payload)).await {
            Ok(result) => {
                if result.confidence >= REMOTE_CONFIDENCE_THRESHOLD {
                    tracing::info!(
                        "LLM mapping confidence {}%: {}",
                        result.confidence,
                        result.reasoning
                    );
                }
                result
            }
            Err(_) => {
                tracing::warn!(
                    "LLM mapping timed out after {:?}, discarding",
                    self.remote_timeout
                );
                MappingResult::failed()
            }
        }
    }
}

/// Resolves every configured path. Missing paths leave the field absent.
pub fn apply_manual_mapping(payload: &Value, config: &FieldMappingConfig) -> ResolvedContact {
    let field = |path: &Option<String>| {
        path.as_deref()
            .and_then(|p| resolve_text(payload, p))
    };

    ResolvedContact {
        email: field(&config.email),
        phone: field(&config.phone),
        first_name: field(&config.first_name),
        last_name: field(&config.last_name),
        company: field(&config.company),
    }
}
