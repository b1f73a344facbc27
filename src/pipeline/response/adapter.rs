//! Key-priority readers over loosely shaped JSON objects.
//!
//! The service has shipped several response layouts. Each reader takes the
//! candidate keys in priority order and uses the first one that is present
//! and not `null`. Values of an unexpected type are skipped with a warning
//! and the field falls back to its empty value.

use serde_json::{Map, Value};
use tracing::warn;

pub type JsonObject = Map<String, Value>;

/// First candidate key whose value is present and non-null.
pub fn first_present<'a>(obj: &'a JsonObject, keys: &[&str]) -> Option<(&'a str, &'a Value)> {
    keys.iter().find_map(|key| {
        obj.get_key_value(*key)
            .filter(|(_, value)| !value.is_null())
            .map(|(k, v)| (k.as_str(), v))
    })
}

/// Nested object under `key`, if it is one.
pub fn object<'a>(obj: &'a JsonObject, key: &str) -> Option<&'a JsonObject> {
    obj.get(key).and_then(Value::as_object)
}

/// Text field; numbers and booleans are rendered, anything else is `""`.
pub fn string(obj: &JsonObject, keys: &[&str]) -> String {
    match first_present(obj, keys) {
        None => String::new(),
        Some((_, Value::String(s))) => s.clone(),
        Some((_, v @ (Value::Number(_) | Value::Bool(_)))) => v.to_string(),
        Some((key, other)) => {
            warn!(key, kind = kind_of(other), "Expected text, field skipped");
            String::new()
        }
    }
}

/// List of strings. A bare string becomes a one-element list; non-string
/// items are rendered; `null` items are dropped.
pub fn string_list(obj: &JsonObject, keys: &[&str]) -> Vec<String> {
    match first_present(obj, keys) {
        None => Vec::new(),
        Some((_, Value::Array(items))) => items
            .iter()
            .filter_map(|item| match item {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
            .collect(),
        Some((_, Value::String(s))) if !s.trim().is_empty() => vec![s.clone()],
        Some((_, Value::String(_))) => Vec::new(),
        Some((key, other)) => {
            warn!(key, kind = kind_of(other), "Expected list, field skipped");
            Vec::new()
        }
    }
}

/// Finite numeric field; numeric strings are accepted, but `"NaN"` and
/// `"inf"` are not.
pub fn number(obj: &JsonObject, keys: &[&str]) -> Option<f64> {
    match first_present(obj, keys)? {
        (_, Value::Number(n)) => n.as_f64(),
        (key, Value::String(s)) => {
            let parsed = s.trim().parse::<f64>().ok().filter(|v| v.is_finite());
            if parsed.is_none() {
                warn!(key, "Expected number, field skipped");
            }
            parsed
        }
        (key, other) => {
            warn!(key, kind = kind_of(other), "Expected number, field skipped");
            None
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
