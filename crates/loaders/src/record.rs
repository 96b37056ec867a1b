//! Records - in-memory parent entities with a dynamic attribute bag

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{ModelError, ModelResult};

/// A persisted entity as seen by the loaders.
///
/// Loaders only ever add attributes to a record they were handed; they
/// never create, drop or keep hold of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Model the record belongs to, used to resolve its relationships
    model: String,
    /// Column values plus any loaded aggregates
    attributes: Map<String, Value>,
}

impl Record {
    /// Create an empty record for a model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            attributes: Map::new(),
        }
    }

    /// Create a record from a JSON object
    pub fn from_json(model: impl Into<String>, value: Value) -> ModelResult<Self> {
        match value {
            Value::Object(attributes) => Ok(Self {
                model: model.into(),
                attributes,
            }),
            other => Err(ModelError::Serialization(format!(
                "Expected a JSON object for a record, got: {}",
                other
            ))),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn get_attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<Value>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    /// Key under which a record is matched to aggregate rows.
    ///
    /// Returns `None` for a missing or null attribute: such a record can
    /// have no related rows.
    pub fn key(&self, name: &str) -> Option<String> {
        self.get_attribute(name).and_then(key_string)
    }
}

/// Canonical string form of a key value, shared by parents and result rows.
///
/// Numbers and strings compare by their text, so an `i64` foreign key
/// decoded from the database matches a JSON number on the parent. Whole
/// floats render as integers: `1.0` and `1` are the same key.
pub fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(number_key(n)),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn number_key(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        // i64::MAX as f64 rounds up to 2^63, hence the strict bound
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            (f as i64).to_string()
        }
        _ => n.to_string(),
    }
}
