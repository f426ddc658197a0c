//! Redaction of secrets before parameters reach the audit log.

use serde_json::{Map, Value};

/// Any key containing one of these (case-insensitive) is redacted.
const SENSITIVE_KEYS: &[&str] = &["password", "secret", "token", "credential"];

const REDACTED: &str = "[REDACTED]";

pub fn sanitize_params(params: &Value) -> Value {
    match params {
        Value::Object(map) => {
            let mut sanitized = Map::new();
            for (key, value) in map {
                let lower = key.to_lowercase();
                let replacement = if SENSITIVE_KEYS.iter().any(|s| lower.contains(s)) {
                    Value::String(REDACTED.to_string())
                } else {
                    sanitize_params(value)
                };
                sanitized.insert(key.clone(), replacement);
            }
            Value::Object(sanitized)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize_params).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_password_params_redacted() {
        let sanitized = sanitize_params(&json!({
            "new_password": "a",
            "Current_Password": "b",
            "password": "c",
            "server_name": "site.test"
        }));
        assert_eq!(sanitized["new_password"], REDACTED);
        assert_eq!(sanitized["Current_Password"], REDACTED);
        assert_eq!(sanitized["password"], REDACTED);
        assert_eq!(sanitized["server_name"], "site.test");
    }

    #[test]
    fn test_nested_values() {
        let sanitized = sanitize_params(&json!({"items": [{"token": "x", "ssl": true}]}));
        assert_eq!(sanitized["items"][0]["token"], REDACTED);
        assert_eq!(sanitized["items"][0]["ssl"], true);
    }
}
