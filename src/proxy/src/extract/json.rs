//! Structured (JSON) payload extraction

use crate::error::{ProxyError, Result};
use bytes::Bytes;
use serde_json::Value;

/// Extract a field from a buffered JSON body by dotted selector.
///
/// Segments name object fields; a numeric segment indexes into an array.
/// A missing field is an extraction error, not a silent default.
pub fn extract(body: &Bytes, selector: &str) -> Result<Value> {
    if selector.is_empty() {
        return Err(ProxyError::Config("payload key field empty".to_string()));
    }

    let document: Value = serde_json::from_slice(body)
        .map_err(|e| ProxyError::Extraction(format!("failed to parse json payload: {e}")))?;

    let mut current = &document;
    for segment in selector.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|idx| items.get(idx)),
            _ => None,
        }
        .ok_or_else(|| ProxyError::Extraction(format!("failed to find field: {selector}")))?;
    }
    Ok(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Bytes {
        Bytes::from(serde_json::to_vec(&value).unwrap())
    }

    #[test]
    fn extracts_top_level_and_nested_fields() {
        let b = body(json!({"foo": "bar", "meta": {"owner": "alice"}}));
        assert_eq!(extract(&b, "foo").unwrap(), json!("bar"));
        assert_eq!(extract(&b, "meta.owner").unwrap(), json!("alice"));
    }

    #[test]
    fn extracts_array_members() {
        let b = body(json!({"names": ["a", "b"]}));
        assert_eq!(extract(&b, "names").unwrap(), json!(["a", "b"]));
        assert_eq!(extract(&b, "names.1").unwrap(), json!("b"));
    }

    #[test]
    fn missing_field_is_an_extraction_error() {
        let b = body(json!({}));
        assert!(matches!(extract(&b, "foo"), Err(ProxyError::Extraction(_))));
    }

    #[test]
    fn malformed_body_is_an_extraction_error() {
        let b = Bytes::from_static(b"not json");
        assert!(matches!(extract(&b, "foo"), Err(ProxyError::Extraction(_))));
    }

    #[test]
    fn extraction_is_idempotent_over_the_buffered_body() {
        let b = body(json!({"foo": "bar"}));
        assert_eq!(extract(&b, "foo").unwrap(), extract(&b, "foo").unwrap());
    }

    #[test]
    fn empty_selector_is_a_config_error() {
        let b = body(json!({"foo": "bar"}));
        assert!(matches!(extract(&b, ""), Err(ProxyError::Config(_))));
    }
}
