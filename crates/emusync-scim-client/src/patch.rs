//! SCIM patch-operations envelope.
//!
//! Incremental updates go to the provider as an ordered list of
//! `{op, path, value}` operations under the PatchOp schemas envelope. The
//! mapping engine feeds `replace` operations through this type; add/remove
//! member edits are built by the caller with the dedicated helpers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use emusync_connector::value::AttributeValue;

use crate::models::PATCH_OP_SCHEMA;

/// One `{op, path, value}` instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// An ordered patch request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperations {
    pub schemas: Vec<String>,
    #[serde(rename = "Operations")]
    pub operations: Vec<PatchOperation>,
}

impl Default for PatchOperations {
    fn default() -> Self {
        Self {
            schemas: vec![PATCH_OP_SCHEMA.to_string()],
            operations: Vec::new(),
        }
    }
}

impl PatchOperations {
    /// Create an empty patch envelope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no operations were recorded. Callers skip the remote PATCH
    /// in that case.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of recorded operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Replace a string attribute. An absent value clears the attribute by
    /// replacing it with the empty string, which is how the provider
    /// interprets removal for simple fields.
    pub fn replace(&mut self, path: &str, value: Option<String>) {
        self.push("replace", path, Some(Value::String(value.unwrap_or_default())));
    }

    /// Replace a boolean attribute.
    pub fn replace_bool(&mut self, path: &str, value: bool) {
        self.push("replace", path, Some(Value::Bool(value)));
    }

    /// Replace an attribute with a raw JSON value.
    pub fn replace_value(&mut self, path: &str, value: Value) {
        self.push("replace", path, Some(value));
    }

    /// Replace a path from a coerced attribute value, choosing the JSON
    /// representation by variant.
    pub fn replace_with(&mut self, path: &str, value: &AttributeValue) {
        match value {
            AttributeValue::Boolean(b) => self.replace_bool(path, *b),
            AttributeValue::Integer(i) => self.replace_value(path, Value::from(*i)),
            AttributeValue::Decimal(d) => self.replace_value(path, Value::from(*d)),
            AttributeValue::Secret(s) => self.replace(path, Some(s.expose().to_string())),
            AttributeValue::Null => self.replace(path, None),
            other => self.replace(path, other.as_string().map(String::from)),
        }
    }

    /// Add values under a path.
    pub fn add(&mut self, path: &str, value: Value) {
        self.push("add", path, Some(value));
    }

    /// Remove a path.
    pub fn remove(&mut self, path: &str) {
        self.push("remove", path, None);
    }

    /// Add group members by id.
    pub fn add_members(&mut self, member_ids: &[String]) {
        if member_ids.is_empty() {
            return;
        }
        let members: Vec<Value> = member_ids
            .iter()
            .map(|id| serde_json::json!({ "value": id }))
            .collect();
        self.add("members", Value::Array(members));
    }

    /// Remove one group member by id.
    pub fn remove_member(&mut self, member_id: &str) {
        self.remove(&format!("members[value eq \"{member_id}\"]"));
    }

    fn push(&mut self, op: &str, path: &str, value: Option<Value>) {
        self.operations.push(PatchOperation {
            op: op.to_string(),
            path: Some(path.to_string()),
            value,
        });
    }
}
