//! Config redaction: produce safe-to-print config snapshots by masking secrets.

use serde_json::Value;

static SENSITIVE_KEYS: &[&str] = &[
    "apiKey",
    "api_key",
    "apikey",
    "authorization",
    "token",
    "accessToken",
    "access_token",
    "secret",
    "password",
];

/// Redact a config JSON value, masking sensitive fields as `"sk-o***"`.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn redact_string(s: &str, key: &str) -> Value {
    if !is_sensitive_key(key) || s.is_empty() {
        return Value::String(s.to_string());
    }
    // Keep a short prefix so the key family stays recognizable.
    let hint = if s.chars().count() > 4 {
        format!("{}***", s.chars().take(4).collect::<String>())
    } else {
        "***".to_string()
    };
    Value::String(hint)
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) => redact_string(s, key),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                result.insert(k.clone(), redact_recursive(v, k));
            }
            Value::Object(result)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_api_key_keeping_prefix() {
        let v = json!({ "model": { "apiKey": "sk-or-v1-abcdef123456" } });
        let redacted = redact(&v);
        assert_eq!(redacted["model"]["apiKey"], "sk-o***");
    }

    #[test]
    fn short_secret_fully_masked() {
        let v = json!({ "password": "abc" });
        assert_eq!(redact(&v)["password"], "***");
    }

    #[test]
    fn passthrough_non_sensitive() {
        let v = json!({ "model": { "model": "gpt-4o-mini" }, "server": { "port": 8080 } });
        let redacted = redact(&v);
        assert_eq!(redacted["model"]["model"], "gpt-4o-mini");
        assert_eq!(redacted["server"]["port"], 8080);
    }
}
