//! Typed schema documents for prompt input and trigger payload shapes.
//!
//! Entities carry a JSON-shaped schema describing the inputs they accept.
//! The schema participates in content hashing, so it needs a canonical
//! form: object keys sorted, null-valued entries dropped, array order
//! preserved (element order is semantically significant for field lists).
//!
//! `SchemaValue` keeps objects in a `BTreeMap`, so key order is canonical
//! by construction no matter how the document arrived.

use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::collections::BTreeMap;

/// A JSON-shaped schema document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<SchemaValue>),
    Object(BTreeMap<String, SchemaValue>),
}

impl SchemaValue {
    /// Return the canonical form of this document.
    ///
    /// Null-valued object entries are removed recursively (the transport
    /// layer serializes absent fields as null). Arrays keep their order
    /// and arity, including null elements.
    pub fn normalize(&self) -> SchemaValue {
        match self {
            SchemaValue::Object(map) => SchemaValue::Object(
                map.iter()
                    .filter(|(_, v)| !matches!(v, SchemaValue::Null))
                    .map(|(k, v)| (k.clone(), v.normalize()))
                    .collect(),
            ),
            SchemaValue::Array(items) => {
                SchemaValue::Array(items.iter().map(SchemaValue::normalize).collect())
            }
            other => other.clone(),
        }
    }

    /// Serialize the normalized document to a deterministic JSON string.
    ///
    /// Two semantically equal schemas always produce identical output,
    /// regardless of key order in the source representation.
    pub fn canonical_json(&self) -> String {
        // BTreeMap ordering plus normalization makes plain serialization
        // deterministic; serde_json cannot fail on this value shape.
        serde_json::to_string(&self.normalize()).unwrap_or_else(|_| "null".to_string())
    }
}

impl From<serde_json::Value> for SchemaValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => SchemaValue::Null,
            serde_json::Value::Bool(b) => SchemaValue::Bool(b),
            serde_json::Value::Number(n) => SchemaValue::Number(n),
            serde_json::Value::String(s) => SchemaValue::String(s),
            serde_json::Value::Array(items) => {
                SchemaValue::Array(items.into_iter().map(SchemaValue::from).collect())
            }
            serde_json::Value::Object(map) => SchemaValue::Object(
                map.into_iter().map(|(k, v)| (k, SchemaValue::from(v))).collect(),
            ),
        }
    }
}
