//! Document Module
//!
//! A document is a flat JSON object carrying a mandatory `id` field.
//!
//! ## Stored Form
//! ```text
//! {"id": "6f1c...-uuid", "name": "alice", "age": 30, ...}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{BlockDocError, Result};

/// Name of the identifier field inside every stored document
pub const ID_FIELD: &str = "id";

/// A JSON document with a UUID identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier (always serialized first)
    pub id: Uuid,

    /// All other fields, never containing `id`
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Document {
    /// Create a document; an `id` key inside `fields` is replaced by `id`
    pub fn new(id: Uuid, mut fields: Map<String, Value>) -> Self {
        fields.remove(ID_FIELD);
        Self { id, fields }
    }

    /// Build a document from a JSON object value
    pub fn from_value(id: Uuid, value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self::new(id, fields)),
            other => Err(BlockDocError::Serialization(format!(
                "document must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Get a field by name (`id` included)
    pub fn get(&self, field: &str) -> Option<Value> {
        if field == ID_FIELD {
            return Some(Value::String(self.id.to_string()));
        }
        self.fields.get(field).cloned()
    }

    /// Non-id fields
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// The document as a single JSON object, `id` included
    pub fn into_value(self) -> Value {
        let mut map = Map::with_capacity(self.fields.len() + 1);
        map.insert(ID_FIELD.to_string(), Value::String(self.id.to_string()));
        map.extend(self.fields);
        Value::Object(map)
    }
}

/// Resolve a caller-supplied identifier
///
/// Empty string generates a fresh v4 UUID; anything else must parse.
pub fn parse_document_id(id: &str) -> Result<Uuid> {
    if id.is_empty() {
        return Ok(Uuid::new_v4());
    }
    Uuid::parse_str(id).map_err(|_| BlockDocError::InvalidIdentifier(id.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
