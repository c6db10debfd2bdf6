//! Record Value Model
//!
//! Incoming JSON values are parsed once into a tagged [`FieldValue`] so the
//! classifier matches on shape instead of inspecting raw JSON.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A raw record as read from a batch file.
pub type Record = Map<String, Value>;

/// Node properties, ordered by key so writes and reports are stable.
pub type PropertyMap = BTreeMap<String, Scalar>;

/// A value that can be stored directly as a node property.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Convert a JSON scalar; returns `None` for arrays and objects.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Scalar::Null),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => Scalar::Int(i),
                None => Scalar::Float(n.as_f64().unwrap_or(f64::NAN)),
            }),
            Value::String(s) => Some(Scalar::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// JSON text of this scalar, used for the serialized-property form.
    pub fn to_json_string(&self) -> String {
        // Serializing a plain scalar cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Shape of a record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Scalar),
    Sequence(Vec<Value>),
    Composite(Map<String, Value>),
}

impl FieldValue {
    pub fn parse(value: &Value) -> Self {
        match value {
            Value::Array(items) => FieldValue::Sequence(items.clone()),
            Value::Object(map) => FieldValue::Composite(map.clone()),
            other => FieldValue::Scalar(Scalar::from_json(other).unwrap_or(Scalar::Null)),
        }
    }

    /// Opaque JSON blob for sequences and composites.
    pub fn to_blob(&self) -> String {
        let json = match self {
            FieldValue::Scalar(s) => return s.to_json_string(),
            FieldValue::Sequence(items) => serde_json::to_string(items),
            FieldValue::Composite(map) => serde_json::to_string(map),
        };
        json.unwrap_or_default()
    }
}
