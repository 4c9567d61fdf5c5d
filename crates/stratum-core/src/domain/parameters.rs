use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Canonical key holding the list of target node ids
pub const NODE_LIST_KEY: &str = "Node[]";

/// Whether a JSON value counts as empty: null, "", [] or {}
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Whether `key` follows the `Namespace.field` convention (or is `Node[]`)
pub fn is_canonical_key(key: &str) -> bool {
    if key == NODE_LIST_KEY {
        return true;
    }
    match key.split_once('.') {
        Some((namespace, field)) => !namespace.is_empty() && !field.is_empty(),
        None => false,
    }
}

/// Flow parameters keyed by canonical `Namespace.field` names, sorted by key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, Value>);

impl ParameterSet {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Insert a parameter only when the value is present and non-empty
    pub fn insert_if_present(&mut self, key: impl Into<String>, value: Option<&Value>) -> bool {
        match value {
            Some(v) if !is_empty_value(v) => {
                self.0.insert(key.into(), v.clone());
                true
            }
            _ => false,
        }
    }

    /// Get a parameter
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether a parameter is present and non-empty
    pub fn has_value(&self, key: &str) -> bool {
        self.0.get(key).map_or(false, |v| !is_empty_value(v))
    }

    /// Node ids listed under `Node[]`
    pub fn node_ids(&self) -> Vec<String> {
        self.0
            .get(NODE_LIST_KEY)
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Iterate over parameters in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
