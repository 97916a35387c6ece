//! Readable one-line rendering of input models for debug logs.
//!
//! A model is serialized to JSON, empty values are dropped, keys are sorted and
//! the result is printed as `[key: value, list: [a, b], nested: [k: v]]`.
//! Fields named in the secret list are replaced by [`REDACTED`] at any depth.

use serde::Serialize;
use serde_json::Value;

pub const REDACTED: &str = "<redacted>";

/// Render `model` for logging, redacting `secret_fields`.
pub fn debug_string<T: Serialize>(model: &T, secret_fields: &[&str]) -> Result<String, String> {
    let mut value =
        serde_json::to_value(model).map_err(|e| format!("marshal model to JSON: {e}"))?;
    redact_fields(&mut value, secret_fields);
    Ok(match &value {
        Value::Object(_) => format_value(&value),
        Value::Null => "[]".to_string(),
        other => format_value(other),
    })
}

/// Replace the values of every key in `secret_fields`, recursively.
pub fn redact_fields(value: &mut Value, secret_fields: &[&str]) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if secret_fields.contains(&key.as_str()) && !is_empty(field) {
                    *field = Value::String(REDACTED.to_string());
                } else {
                    redact_fields(field, secret_fields);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                redact_fields(item, secret_fields);
            }
        }
        _ => {}
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .filter_map(|key| {
                    let field = map.get(key)?;
                    (!is_empty(field)).then(|| format!("{key}: {}", format_value(field)))
                })
                .collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sorted_and_empty_values_dropped() {
        let model = json!({
            "zone": "eu01",
            "name": "my-img",
            "labels": {},
            "comment": "",
            "records": ["1.2.3.4", "5.6.7.8"],
            "ttl": 3600,
            "protected": false,
            "owner": null
        });
        assert_eq!(
            debug_string(&model, &[]).unwrap(),
            "[name: my-img, protected: false, records: [1.2.3.4, 5.6.7.8], ttl: 3600, zone: eu01]"
        );
    }

    #[test]
    fn test_nested_maps_and_lists_of_maps() {
        let model = json!({
            "global": {"region": "eu01", "project_id": "p"},
            "items": [{"b": 1, "a": 2}]
        });
        assert_eq!(
            debug_string(&model, &[]).unwrap(),
            "[global: [project_id: p, region: eu01], items: [[a: 2, b: 1]]]"
        );
    }

    #[test]
    fn test_secret_fields_are_redacted_at_any_depth() {
        let model = json!({
            "token": "s3cr3t",
            "nested": {"private_key": "-----BEGIN", "kid": "k1"},
            "empty_token": ""
        });
        let rendered =
            debug_string(&model, &["token", "private_key", "empty_token"]).unwrap();
        assert_eq!(rendered, "[nested: [kid: k1, private_key: <redacted>], token: <redacted>]");
        assert!(!rendered.contains("s3cr3t"));
    }

    #[test]
    fn test_null_model() {
        assert_eq!(debug_string(&Value::Null, &[]).unwrap(), "[]");
    }
}
