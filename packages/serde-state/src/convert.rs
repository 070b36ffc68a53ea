//! Conversions between Value and serde types.

use bgstate_core::{State, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as Json;

use crate::error::{Error, Result};

/// Convert a Value to a Rust type via serde.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value_to_json(value)).map_err(|e| Error::Decode(e.to_string()))
}

/// Convert a Rust type to a Value via serde.
pub fn to_value<T: Serialize>(data: &T) -> Result<Value> {
    let json = serde_json::to_value(data).map_err(|e| Error::Encode(e.to_string()))?;
    Ok(json_to_value(json))
}

/// Convert a Rust type to a partial state. The type must serialize to a map.
pub fn to_state<T: Serialize>(data: &T) -> Result<State> {
    match to_value(data)? {
        Value::Map(map) => Ok(map),
        other => Err(Error::NotAMap {
            found: kind(&other),
        }),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Integer(_) => "an integer",
        Value::Float(_) => "a float",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Map(_) => "a map",
    }
}

/// Convert a Value to JSON. Non-finite floats become `null`.
pub fn value_to_json(value: Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => b.into(),
        Value::Integer(i) => i.into(),
        Value::Float(f) => f.into(),
        Value::String(s) => s.into(),
        Value::Array(items) => items.into_iter().map(value_to_json).collect(),
        Value::Map(map) => Json::Object(
            map.into_iter()
                .map(|(key, value)| (key, value_to_json(value)))
                .collect(),
        ),
    }
}

/// Convert JSON to a Value.
pub fn json_to_value(json: Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => number_to_value(&n),
        Json::String(s) => Value::String(s),
        Json::Array(items) => Value::Array(items.into_iter().map(json_to_value).collect()),
        Json::Object(map) => Value::Map(
            map.into_iter()
                .map(|(key, value)| (key, json_to_value(value)))
                .collect(),
        ),
    }
}

// i64 when it fits, f64 otherwise.
fn number_to_value(n: &serde_json::Number) -> Value {
    match (n.as_i64(), n.as_f64()) {
        (Some(i), _) => Value::Integer(i),
        (None, Some(f)) => Value::Float(f),
        (None, None) => Value::String(n.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bgstate_core::state;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Tab {
        id: u32,
        title: String,
        pinned: bool,
    }

    #[test]
    fn struct_to_state() {
        let tab = Tab {
            id: 4,
            title: "Inbox".to_string(),
            pinned: true,
        };

        let s = to_state(&tab).unwrap();
        assert_eq!(
            s,
            state! { "id" => 4, "title" => "Inbox", "pinned" => true }
        );

        let back: Tab = from_value(Value::Map(s)).unwrap();
        assert_eq!(back, tab);
    }

    #[test]
    fn non_map_is_rejected() {
        let err = to_state(&vec![1, 2]).unwrap_err();
        assert!(matches!(err, Error::NotAMap { found: "an array" }));
    }

    #[test]
    fn numbers_keep_their_kind() {
        let value = json_to_value(serde_json::json!({
            "tabs": 12,
            "offset": -3,
            "zoom": 1.25,
            "quota": u64::MAX,
        }));

        assert_eq!(
            value,
            Value::Map(state! {
                "tabs" => 12,
                "offset" => -3,
                "zoom" => 1.25,
                "quota" => u64::MAX as f64,
            })
        );
    }

    #[test]
    fn non_finite_float_becomes_null() {
        assert_eq!(value_to_json(Value::Float(f64::INFINITY)), Json::Null);
    }

    #[test]
    fn decode_mismatch() {
        let err = from_value::<Tab>(Value::from("nope")).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
