//! Schema Validation
//!
//! Structural validation of JSON values against a JSON-Schema subset:
//! required fields, property types, enum membership, string `pattern` and
//! `minLength`, and per-item checks on arrays. Returns the complete error
//! list rather than stopping at the first mismatch, so a rejected tool call
//! reports everything wrong with its arguments at once.

use serde_json::Value;

/// Validate `value` against `schema`, returning all violations found.
///
/// An empty vector means the value conforms. An empty or non-object schema
/// accepts everything.
pub fn validate_value(value: &Value, schema: &Value) -> Vec<String> {
    let mut errors = Vec::new();
    validate_at("", value, schema, &mut errors);
    errors
}

fn validate_at(path: &str, value: &Value, schema: &Value, errors: &mut Vec<String>) {
    if !schema.is_object() {
        return;
    }

    // Top-level type constraint
    if let Some(expected_type) = schema.get("type").and_then(|v| v.as_str()) {
        let actual_type = json_type_name(value);
        if actual_type != expected_type
            && !(expected_type == "number" && actual_type == "integer")
        {
            errors.push(format!(
                "Type mismatch at '{}': expected {}, got {}",
                display_path(path),
                expected_type,
                actual_type
            ));
            return;
        }
    }

    // Enum membership
    if let Some(allowed) = schema.get("enum").and_then(|v| v.as_array()) {
        if !allowed.contains(value) {
            errors.push(format!(
                "Value at '{}' is not one of the allowed values",
                display_path(path)
            ));
        }
    }

    // String constraints
    if let Some(str_value) = value.as_str() {
        if let Some(pattern) = schema.get("pattern").and_then(|v| v.as_str()) {
            if let Ok(re) = regex::Regex::new(pattern) {
                if !re.is_match(str_value) {
                    errors.push(format!(
                        "Pattern violation at '{}': value '{}' does not match '{}'",
                        display_path(path),
                        str_value,
                        pattern
                    ));
                }
            }
        }
        if let Some(min_length) = schema.get("minLength").and_then(|v| v.as_u64()) {
            if (str_value.chars().count() as u64) < min_length {
                errors.push(format!(
                    "String too short at '{}': length {} < minimum {}",
                    display_path(path),
                    str_value.chars().count(),
                    min_length
                ));
            }
        }
    }

    // Object constraints
    if let Some(obj) = value.as_object() {
        if let Some(required) = schema.get("required").and_then(|v| v.as_array()) {
            for req in required {
                if let Some(field) = req.as_str() {
                    if !obj.contains_key(field) {
                        errors.push(format!(
                            "Missing required field at '{}': '{}'",
                            display_path(path),
                            field
                        ));
                    }
                }
            }
        }
        if let Some(properties) = schema.get("properties").and_then(|v| v.as_object()) {
            for (prop_name, prop_schema) in properties {
                if let Some(prop_value) = obj.get(prop_name) {
                    let child = join_path(path, prop_name);
                    validate_at(&child, prop_value, prop_schema, errors);
                }
            }
        }
    }

    // Array item constraints
    if let Some(items) = value.as_array() {
        if let Some(items_schema) = schema.get("items") {
            for (idx, item) in items.iter().enumerate() {
                let child = format!("{}[{}]", path, idx);
                validate_at(&child, item, items_schema, errors);
            }
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "integer"
            } else {
                "number"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join_path(base: &str, field: &str) -> String {
    if base.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", base, field)
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "$"
    } else {
        path
    }
}
