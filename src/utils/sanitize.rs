use serde_json::Value;

/// Masks credential-bearing fields in JSON payloads before they are logged.
pub fn sanitize_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sanitized = serde_json::Map::new();
            for (key, val) in map {
                let sanitized_val = if is_sensitive_field(key) {
                    mask_value(val)
                } else {
                    sanitize_json(val)
                };
                sanitized.insert(key.clone(), sanitized_val);
            }
            Value::Object(sanitized)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sanitize_json).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_field(key: &str) -> bool {
    matches!(
        key.to_lowercase().as_str(),
        "password" | "secret" | "token" | "api_key" | "authorization" | "jwt" | "email"
    )
}

fn mask_value(value: &Value) -> Value {
    match value {
        Value::String(s) if s.chars().count() > 8 => {
            let chars: Vec<char> = s.chars().collect();
            let visible: String = chars[..4].iter().collect();
            let end: String = chars[chars.len() - 4..].iter().collect();
            Value::String(format!("{}****{}", visible, end))
        }
        _ => Value::String("****".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_token() {
        let input = json!({
            "token": "eyJhbGciOiJIUzI1NiJ9.payload.signature",
            "cashAdjustment": "500.00"
        });

        let sanitized = sanitize_json(&input);
        let token = sanitized["token"].as_str().unwrap();

        assert!(token.contains("****"));
        assert!(!token.contains("payload"));
        assert_eq!(sanitized["cashAdjustment"], "500.00");
    }

    #[test]
    fn test_sanitize_nested() {
        let input = json!({
            "user": {
                "password": "hunter2",
                "display_name": "Asha"
            }
        });

        let sanitized = sanitize_json(&input);
        assert_eq!(sanitized["user"]["password"], "****");
        assert_eq!(sanitized["user"]["display_name"], "Asha");
    }

    #[test]
    fn test_mask_handles_multibyte() {
        let masked = mask_value(&json!("ñandú-ñandú-ñandú"));
        assert!(masked.as_str().unwrap().starts_with("ñand"));
    }
}
