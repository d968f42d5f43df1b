//! Backend-agnostic record handed to the rendering layer.

use crate::config::ID_PATH;
use crate::error::NormalizeError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record from either the native store or a REST payload. Field access is uniform via [`Item::get`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item {
    fields: Map<String, Value>,
}

impl Item {
    pub fn new(fields: Map<String, Value>) -> Self {
        Item { fields }
    }

    /// Items must be JSON objects.
    pub fn from_value(value: Value) -> Result<Self, NormalizeError> {
        match value {
            Value::Object(fields) => Ok(Item { fields }),
            other => Err(NormalizeError::new(format!("expected an object record, got {}", json_kind(&other)))),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    pub fn id(&self) -> Option<&Value> {
        self.fields.get(ID_PATH)
    }

    /// Id rendered as a path segment: strings verbatim, numbers in decimal.
    pub fn id_string(&self) -> Option<String> {
        self.id().and_then(value_to_plain_string)
    }

    /// Copy `item[primary_key]` into `id` (REST records name their key arbitrarily).
    pub fn with_id_from(mut self, primary_key: &str) -> Self {
        if primary_key != ID_PATH {
            if let Some(v) = self.fields.get(primary_key).cloned() {
                self.fields.insert(ID_PATH.to_string(), v);
            }
        }
        self
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Strings without quotes, numbers and booleans via Display; null/arrays/objects are not plain.
pub fn value_to_plain_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
