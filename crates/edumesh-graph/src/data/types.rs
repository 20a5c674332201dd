//! Scalar property values carried by graph nodes and relationships

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::data::errors::StoreError;

/// Property map of a node or relationship.
///
/// Ordered so that snapshots and generated statements are reproducible.
pub type Properties = BTreeMap<String, PropertyValue>;

/// A single scalar property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PropertyValue::Bool(b) => serde_json::Value::Bool(*b),
            PropertyValue::Integer(i) => serde_json::json!(i),
            PropertyValue::Float(f) => serde_json::json!(f),
            PropertyValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(v) => write!(f, "{}", v),
            PropertyValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&String> for PropertyValue {
    fn from(s: &String) -> Self {
        PropertyValue::String(s.clone())
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<PropertyValue> for serde_json::Value {
    fn from(value: PropertyValue) -> Self {
        value.to_json()
    }
}

impl TryFrom<&serde_json::Value> for PropertyValue {
    type Error = StoreError;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Bool(b) => Ok(PropertyValue::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(PropertyValue::Integer(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(PropertyValue::Float(f))
                } else {
                    Err(StoreError::InvalidInput(format!("Unrepresentable number: {}", n)))
                }
            }
            serde_json::Value::String(s) => Ok(PropertyValue::String(s.clone())),
            other => Err(StoreError::InvalidInput(format!(
                "Property values must be scalars, got: {}",
                other
            ))),
        }
    }
}

/// Builds a [`Properties`] map from key/value pairs.
///
/// ```
/// use edumesh_graph::props;
///
/// let p = props! { "role" => "Teacher", "years" => 4 };
/// assert_eq!(p.len(), 2);
/// ```
#[macro_export]
macro_rules! props {
    () => { $crate::data::types::Properties::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::data::types::Properties::new();
        $( map.insert($key.to_string(), $crate::data::types::PropertyValue::from($value)); )+
        map
    }};
}

/// Converts a JSON object into scalar properties.
///
/// Non-scalar members are rejected; `null` members are dropped.
pub fn properties_from_json(
    object: &serde_json::Map<String, serde_json::Value>,
) -> Result<Properties, StoreError> {
    let mut properties = Properties::new();
    for (key, value) in object {
        if value.is_null() {
            continue;
        }
        let value = PropertyValue::try_from(value)
            .map_err(|e| StoreError::InvalidInput(format!("Property '{}': {}", key, e)))?;
        properties.insert(key.clone(), value);
    }
    Ok(properties)
}
