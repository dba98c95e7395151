use serde_json::Value;

/// Resolves a dot-separated key path (e.g. `"user.contact.email"`) in a JSON value.
///
/// Only object keys are followed; there is no array-index syntax. Returns
/// `None` for an empty path, a missing key, or a non-object along the way.
/// A key holding JSON `null` resolves to `Some(&Value::Null)`.
pub fn resolve<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    path.split('.')
        .try_fold(root, |current, segment| current.as_object()?.get(segment))
}

/// Renders a JSON value as a contact field, applying truthiness rules.
///
/// Non-empty strings are returned verbatim and non-zero numbers as their
/// JSON text. `null`, booleans, zero, arrays and objects are absent.
pub fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

/// `resolve` followed by `field_text`.
pub fn resolve_text(root: &Value, path: &str) -> Option<String> {
    resolve(root, path).and_then(field_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_nested_chain() {
        let payload = json!({"a": {"b": {"c": "deep"}}});
        assert_eq!(resolve(&payload, "a.b.c"), Some(&json!("deep")));
        assert_eq!(resolve(&payload, "a.b"), Some(&json!({"c": "deep"})));
    }

    #[test]
    fn test_resolve_missing_link_is_none() {
        let payload = json!({"a": {"b": "leaf"}});
        assert_eq!(resolve(&payload, "a.x.c"), None);
        // "b" is a string, not a mapping
        assert_eq!(resolve(&payload, "a.b.c"), None);
        assert_eq!(resolve(&payload, "z"), None);
    }

    #[test]
    fn test_resolve_empty_path_is_none() {
        assert_eq!(resolve(&json!({"": 1}), ""), None);
    }

    #[test]
    fn test_resolve_does_not_index_arrays() {
        let payload = json!({"items": [{"email": "a@b.com"}]});
        assert_eq!(resolve(&payload, "items.0.email"), None);
    }

    #[test]
    fn test_resolve_null_is_present_but_empty() {
        let payload = json!({"user": {"email": null}});
        assert_eq!(resolve(&payload, "user.email"), Some(&Value::Null));
        assert_eq!(resolve_text(&payload, "user.email"), None);
    }

    #[test]
    fn test_field_text_truthiness() {
        assert_eq!(field_text(&json!("x")), Some("x".to_string()));
        assert_eq!(field_text(&json!(" spaced ")), Some(" spaced ".to_string()));
        assert_eq!(field_text(&json!(5551234567u64)), Some("5551234567".to_string()));
        assert_eq!(field_text(&json!("")), None);
        assert_eq!(field_text(&json!(0)), None);
        assert_eq!(field_text(&json!(true)), None);
        assert_eq!(field_text(&json!({"a": 1})), None);
    }
}
