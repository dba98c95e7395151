//! Payload-shape fingerprints for caching learned mappings.
//!
//! Two payloads share a fingerprint when they have the same set of
//! top-level keys, regardless of key order or values.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// SHA-256 (hex) of the sorted top-level key list.
///
/// Non-object payloads hash an empty key list.
pub fn payload_fingerprint(payload: &Value) -> String {
    let mut keys: Vec<&str> = payload
        .as_object()
        .map(|map| map.keys().map(String::as_str).collect())
        .unwrap_or_default();
    keys.sort_unstable();

    let mut hasher = Sha256::new();
    for key in keys {
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// Cache key for a mapping learned for `source_id` from payloads shaped like `payload`.
pub fn mapping_cache_key(source_id: &str, payload: &Value) -> String {
    let fingerprint = payload_fingerprint(payload);
    format!("mapping:{}:{}", source_id, &fingerprint[..20])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fingerprint_ignores_order_and_values() {
        let a = json!({"email": "a@b.com", "name": "A"});
        let b = json!({"name": "Other", "email": 12});
        assert_eq!(payload_fingerprint(&a), payload_fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_differs_by_keys() {
        let a = json!({"email": "a@b.com"});
        let b = json!({"mail": "a@b.com"});
        assert_ne!(payload_fingerprint(&a), payload_fingerprint(&b));
    }

    #[test]
    fn test_cache_key_format() {
        let key = mapping_cache_key("src-1", &json!({"email": "x"}));
        assert!(key.starts_with("mapping:src-1:"));
        assert_eq!(key.len(), "mapping:src-1:".len() + 20);
    }
}
