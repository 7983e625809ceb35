//! Typed attribute values.
//!
//! Span, event and resource attributes arrive as dynamically typed values.
//! [`AttributeValue`] makes the variants explicit so the translator can tell
//! apart the scalars X-Ray accepts as annotations from the nested structures
//! it can only store as metadata.

use crate::segment::AnnotationValue;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;

/// Insertion-ordered attribute map, keyed by attribute name.
pub type AttributeMap = IndexMap<String, AttributeValue>;

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    List(Vec<AttributeValue>),
    Map(AttributeMap),
    #[default]
    Empty,
}

impl AttributeValue {
    /// Returns the string payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the string payload when it is non-empty.
    pub fn as_non_empty_str(&self) -> Option<&str> {
        self.as_str().filter(|s| !s.is_empty())
    }

    /// Returns the integer payload, if this is an integer value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Reads an integer that instrumentations sometimes record as a string
    /// (e.g. `http.status_code = "200"`).
    pub fn as_i64_lenient(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i),
            AttributeValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Renders a string or integer value as text; used for ports, which show
    /// up with either type.
    pub fn to_text(&self) -> Option<String> {
        match self {
            AttributeValue::String(s) => Some(s.clone()),
            AttributeValue::Int(i) => Some(i.to_string()),
            _ => None,
        }
    }

    /// Converts to an annotation value. Only the four X-Ray scalar types are
    /// eligible; everything else returns `None`.
    pub fn to_annotation(&self) -> Option<AnnotationValue> {
        match self {
            AttributeValue::String(s) => Some(AnnotationValue::String(s.clone())),
            AttributeValue::Int(i) => Some(AnnotationValue::Int(*i)),
            AttributeValue::Double(d) => Some(AnnotationValue::Double(*d)),
            AttributeValue::Bool(b) => Some(AnnotationValue::Bool(*b)),
            _ => None,
        }
    }

    /// Converts to a metadata value, preserving lists and maps structurally.
    ///
    /// Bytes and empty values are not representable and return `None`; inside
    /// a list or map they become `null` so positions and keys are kept.
    pub fn to_metadata(&self) -> Option<JsonValue> {
        match self {
            AttributeValue::String(s) => Some(JsonValue::String(s.clone())),
            AttributeValue::Int(i) => Some(JsonValue::from(*i)),
            AttributeValue::Double(d) => Some(JsonValue::from(*d)),
            AttributeValue::Bool(b) => Some(JsonValue::Bool(*b)),
            AttributeValue::List(items) => Some(JsonValue::Array(
                items
                    .iter()
                    .map(|item| item.to_metadata().unwrap_or(JsonValue::Null))
                    .collect(),
            )),
            AttributeValue::Map(map) => Some(JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_metadata().unwrap_or(JsonValue::Null)))
                    .collect(),
            )),
            AttributeValue::Bytes(_) | AttributeValue::Empty => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Int(value.into())
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Double(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<Vec<AttributeValue>> for AttributeValue {
    fn from(value: Vec<AttributeValue>) -> Self {
        AttributeValue::List(value)
    }
}

impl From<AttributeMap> for AttributeValue {
    fn from(value: AttributeMap) -> Self {
        AttributeValue::Map(value)
    }
}

/// Builds an [`AttributeMap`] from `(key, value)` pairs.
///
/// ```
/// use xray_segment_translator::{attributes, AttributeValue};
///
/// let attrs = attributes([("http.method", "GET".into()), ("http.status_code", 200.into())]);
/// assert_eq!(attrs.get("http.status_code"), Some(&AttributeValue::Int(200)));
/// ```
pub fn attributes<K, I>(pairs: I) -> AttributeMap
where
    K: Into<String>,
    I: IntoIterator<Item = (K, AttributeValue)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
