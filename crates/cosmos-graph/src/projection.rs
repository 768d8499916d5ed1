//! Graph elements returned by queries, and typed property extraction.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Errors from reading a property off a graph element.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProjectionError {
    #[error("Property {property:?} not found on element {element}")]
    PropertyNotFound { element: String, property: String },

    #[error("Property {property:?} on element {element} is {found}, expected {expected}")]
    TypeMismatch {
        element: String,
        property: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// A Rust type a property value can be read as.
///
/// `from_value` returns `None` when the stored JSON value has a different type.
pub trait PropertyType: Sized {
    const NAME: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

impl PropertyType for String {
    const NAME: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl PropertyType for i64 {
    const NAME: &'static str = "integer";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl PropertyType for u32 {
    const NAME: &'static str = "unsigned 32-bit integer";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_u64().and_then(|v| u32::try_from(v).ok())
    }
}

impl PropertyType for f64 {
    const NAME: &'static str = "number";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl PropertyType for bool {
    const NAME: &'static str = "boolean";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

/// Name of the JSON type actually stored, for mismatch messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "floating-point number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

fn project<T: PropertyType>(
    element: &str,
    property: &str,
    value: Option<&Value>,
) -> Result<T, ProjectionError> {
    let value = value.ok_or_else(|| ProjectionError::PropertyNotFound {
        element: element.to_string(),
        property: property.to_string(),
    })?;
    T::from_value(value).ok_or_else(|| ProjectionError::TypeMismatch {
        element: element.to_string(),
        property: property.to_string(),
        expected: T::NAME,
        found: value_kind(value),
    })
}

/// Element ids are strings on Cosmos DB but numbers on other Gremlin servers.
fn element_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// One value of a (possibly multi-valued) vertex property.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VertexProperty {
    #[serde(default)]
    pub id: Value,
    pub value: Value,
    /// Meta-properties attached to this value.
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

/// A vertex as returned by the Gremlin endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Vertex {
    #[serde(deserialize_with = "element_id")]
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub properties: HashMap<String, Vec<VertexProperty>>,
}

impl Vertex {
    /// First recorded value of `name`; later values of a multi-valued property are ignored.
    pub fn first_value(&self, name: &str) -> Option<&Value> {
        self.properties
            .get(name)
            .and_then(|values| values.first())
            .map(|p| &p.value)
    }

    /// All recorded values of `name`, in server order.
    pub fn values(&self, name: &str) -> impl Iterator<Item = &Value> {
        self.properties
            .get(name)
            .into_iter()
            .flatten()
            .map(|p| &p.value)
    }

    /// Read the first value of `name` as `T`.
    pub fn property<T: PropertyType>(&self, name: &str) -> Result<T, ProjectionError> {
        project(&self.id, name, self.first_value(name))
    }
}

/// An edge as returned by the Gremlin endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Edge {
    #[serde(deserialize_with = "element_id")]
    pub id: String,
    pub label: String,
    #[serde(rename = "outV", deserialize_with = "element_id")]
    pub out_v: String,
    #[serde(rename = "inV", deserialize_with = "element_id")]
    pub in_v: String,
    #[serde(rename = "outVLabel", default)]
    pub out_v_label: Option<String>,
    #[serde(rename = "inVLabel", default)]
    pub in_v_label: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

impl Edge {
    pub fn property<T: PropertyType>(&self, name: &str) -> Result<T, ProjectionError> {
        project(&self.id, name, self.properties.get(name))
    }
}
