//! Typed conversion between metadata values and Rust types.
//!
//! Conversion is explicit: each target type implements [`FromMetadata`], and
//! [`convert`] layers the store-wide coercion rules on top (single-element
//! sequence flattening; `Vec<T>` additionally wraps a lone scalar). There is
//! no reflection-style "try every type" fallback.

use serde_json::Value;

/// A type that can be produced from a metadata value.
pub trait FromMetadata: Sized {
    /// Name used in conversion diagnostics.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Attempt the direct conversion, without coercion rules.
    fn from_value(value: &Value) -> Option<Self>;
}

/// Convert a value using the store's coercion rules: the direct conversion
/// first, then flattening a single-element sequence to its element.
pub fn convert<T: FromMetadata>(value: &Value) -> Option<T> {
    if let Some(v) = T::from_value(value) {
        return Some(v);
    }
    if let Value::Array(items) = value
        && items.len() == 1
    {
        return T::from_value(&items[0]);
    }
    None
}

/// Human-readable kind of a JSON value, for diagnostics.
pub fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "map",
    }
}

impl FromMetadata for Value {
    fn type_name() -> &'static str {
        "value"
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromMetadata for String {
    fn type_name() -> &'static str {
        "string"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl FromMetadata for bool {
    fn type_name() -> &'static str {
        "bool"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromMetadata for i64 {
    fn type_name() -> &'static str {
        "i64"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromMetadata for u64 {
    fn type_name() -> &'static str {
        "u64"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromMetadata for usize {
    fn type_name() -> &'static str {
        "usize"
    }

    fn from_value(value: &Value) -> Option<Self> {
        u64::from_value(value).and_then(|n| usize::try_from(n).ok())
    }
}

impl FromMetadata for f64 {
    fn type_name() -> &'static str {
        "f64"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            // Numeric widening: integers convert losslessly.
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl<T: FromMetadata> FromMetadata for Vec<T> {
    fn type_name() -> &'static str {
        "sequence"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => items.iter().map(T::from_value).collect(),
            // A lone scalar converts to a single-element sequence.
            other => T::from_value(other).map(|v| vec![v]),
        }
    }
}
