//! The Value type - a tree-shaped data structure.
//!
//! Every entry of the shared state is a `Value`. It maps directly to JSON and
//! serializes through serde without a tag, so a persisted blob reads back as
//! the same tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The shared state: a flat mapping from string keys to values.
///
/// Commits merge into this map key by key; a key, once present, is only ever
/// overwritten, never removed.
pub type State = BTreeMap<String, Value>;

/// A tree-shaped value that can be stored under a state key.
///
/// # Design Notes
///
/// - Uses `BTreeMap` for deterministic ordering (important for comparison and snapshots)
/// - Uses `i64` for integers, `f64` for everything else numeric
/// - Untagged serde representation, so `{"apples": 2}` is a map holding an integer
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absence of a value. Distinct from "key doesn't exist".
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Key-value map with string keys.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Create a null value.
    pub fn null() -> Self {
        Value::Null
    }

    /// Create an empty map.
    pub fn map() -> Self {
        Value::Map(BTreeMap::new())
    }

    /// Create an empty array.
    pub fn array() -> Self {
        Value::Array(Vec::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// The integer payload, if this is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// The numeric payload widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Consume a map value into a `State`. Non-map values yield `None`.
    pub fn into_state(self) -> Option<State> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

/// Merge `patch` into `state`, overwriting existing keys one level deep.
///
/// Nested maps are replaced, not merged recursively.
pub fn merge(state: &mut State, patch: State) {
    state.extend(patch);
}

/// Build a `State` from `key => value` pairs.
///
/// ```rust
/// use bgstate_core::{state, Value};
///
/// let s = state! { "apples" => 2, "name" => "orchard" };
/// assert_eq!(s["apples"], Value::Integer(2));
/// ```
#[macro_export]
macro_rules! state {
    () => {
        $crate::State::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut state = $crate::State::new();
        $(state.insert(::std::string::String::from($key), $crate::Value::from($value));)+
        state
    }};
}

// Conversion from common types

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl From<State> for Value {
    fn from(v: State) -> Self {
        Value::Map(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
