//! Defensive accessors over model output.
//!
//! Agents are prompted for a particular JSON shape but nothing guarantees it:
//! replies may be objects, strings holding JSON (sometimes encoded twice),
//! bare scalars, or missing entirely. Every read of agent output goes through
//! these helpers, which return a typed default when the shape does not match.

use serde_json::{Map, Value};

use ticketflow_core::domain::response::MAX_CONFIDENCE;

pub type JsonObject = Map<String, Value>;

pub const DEFAULT_CONFIDENCE: u8 = 50;

/// Parses `raw` as JSON. When the payload is itself a JSON string, the inner
/// text is decoded once more, since models occasionally double-encode their
/// own output. An inner string that is not JSON is kept as a string.
pub fn decode_layers(raw: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(raw.trim()).ok()? {
        Value::String(inner) => {
            Some(serde_json::from_str::<Value>(inner.trim()).unwrap_or(Value::String(inner)))
        }
        other => Some(other),
    }
}

/// Turns one agent reply into an object.
///
/// Objects pass through. Strings are decoded; undecodable strings and any
/// other raw shape fall back to `skeleton`. A decoded value that is still not
/// an object is wrapped as `{default_key: <text>}`.
pub fn coerce_object(value: Value, default_key: &str, skeleton: fn() -> JsonObject) -> JsonObject {
    let decoded = match value {
        Value::Object(map) => return map,
        Value::String(raw) => match decode_layers(&raw) {
            Some(decoded) => decoded,
            None => return skeleton(),
        },
        _ => return skeleton(),
    };

    match decoded {
        Value::Object(map) => map,
        other => wrap(default_key, other),
    }
}

/// `{key: <text of value>}`.
pub fn wrap(key: &str, value: Value) -> JsonObject {
    let mut map = JsonObject::new();
    map.insert(key.to_string(), Value::String(as_text(&value)));
    map
}

/// Display text of any JSON value: strings verbatim, `null` as empty, other
/// values as compact JSON.
pub fn as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Text of `map[key]`, treating `null` as absent.
pub fn text_field(map: &JsonObject, key: &str) -> Option<String> {
    map.get(key).filter(|value| !value.is_null()).map(as_text)
}

/// A nested object at `map[key]`, decoding it first when it arrived as a
/// JSON string.
pub fn object_field(map: &JsonObject, key: &str) -> Option<JsonObject> {
    match map.get(key)? {
        Value::Object(nested) => Some(nested.clone()),
        Value::String(raw) => match decode_layers(raw)? {
            Value::Object(nested) => Some(nested),
            _ => None,
        },
        _ => None,
    }
}

/// Sequence of display strings. Arrays keep their non-null items, a JSON
/// string holding an array is decoded, other strings and scalars become a
/// single entry.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            items.iter().filter(|item| !item.is_null()).map(as_text).collect()
        }
        Some(Value::String(raw)) if raw.trim().is_empty() => Vec::new(),
        Some(Value::String(raw)) => match decode_layers(raw) {
            Some(Value::Array(items)) => {
                items.iter().filter(|item| !item.is_null()).map(as_text).collect()
            }
            _ => vec![raw.clone()],
        },
        Some(other) => vec![as_text(other)],
    }
}

/// Maps a numeric or qualitative confidence signal onto `0..=100`.
///
/// Numbers are truncated to integers. `high`/`medium`/`low` map to 80/50/20,
/// other strings are parsed as integers. Anything unparseable, missing or of
/// another type yields [`DEFAULT_CONFIDENCE`].
pub fn coerce_confidence(value: Option<&Value>) -> u8 {
    let raw = match value {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|float| float.is_finite()).map(|float| float as i64)),
        Some(Value::String(label)) => {
            let label = label.trim();
            match label.to_ascii_lowercase().as_str() {
                "high" => Some(80),
                "medium" => Some(50),
                "low" => Some(20),
                _ => label.parse::<i64>().ok(),
            }
        }
        _ => None,
    };

    match raw {
        Some(score) => score.clamp(0, i64::from(MAX_CONFIDENCE)) as u8,
        None => DEFAULT_CONFIDENCE,
    }
}
