//! Aggregation of store subtrees into nested attribute maps
//!
//! Agents write each node's state as a directory tree
//! (`/nodes/<id>/<Group>/<field>`). [`aggregate`] collapses such a tree into a
//! nested mapping keyed by lower-cased path segments, pruning internal
//! branches named by [`TERMINAL_MARKERS`].

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use stratum_state_store::StoreNode;

/// Segments below which aggregation never descends
pub const TERMINAL_MARKERS: &[&str] = &["definitions", "raw_map"];

/// Nested mapping produced by aggregation
pub type TreeMap = BTreeMap<String, TreeValue>;

/// A value in an aggregated tree: a leaf value or a nested mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TreeValue {
    /// Scalar value of a store leaf
    Leaf(String),
    /// Nested mapping built from a store directory
    Subtree(TreeMap),
}

impl TreeValue {
    /// The nested mapping, if this is a subtree
    pub fn as_subtree(&self) -> Option<&TreeMap> {
        match self {
            TreeValue::Subtree(map) => Some(map),
            TreeValue::Leaf(_) => None,
        }
    }

    /// The scalar value, if this is a leaf
    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            TreeValue::Leaf(value) => Some(value),
            TreeValue::Subtree(_) => None,
        }
    }

    /// Whether this is an empty leaf or an empty subtree
    pub fn is_empty(&self) -> bool {
        match self {
            TreeValue::Leaf(value) => value.is_empty(),
            TreeValue::Subtree(map) => map.is_empty(),
        }
    }

    /// Convert into a JSON value (leaves become strings)
    pub fn to_json(&self) -> Value {
        match self {
            TreeValue::Leaf(value) => Value::String(value.clone()),
            TreeValue::Subtree(map) => Value::Object(tree_map_to_json(map)),
        }
    }
}

/// Convert an aggregated mapping into a JSON object
pub fn tree_map_to_json(map: &TreeMap) -> Map<String, Value> {
    map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
}

/// Whether a lower-cased segment stops descent
pub fn is_terminal(segment: &str) -> bool {
    TERMINAL_MARKERS.contains(&segment)
}

/// Aggregate the subtree rooted at `root` into `{root_segment: {...}}`.
pub fn aggregate(root: &StoreNode) -> TreeMap {
    let mut attrs = TreeMap::new();
    merge_into(root, &mut attrs);
    attrs
}

/// Merge the children of `parent` into `attrs` under the parent's segment.
///
/// The parent slot is created as an empty subtree on first use. Leaves land
/// under it (`{parent: {child: value}}`) while the slot holds a subtree; when
/// the slot is already taken by a scalar, children are flattened next to it
/// (`{child: value}`). Directories with no children leave no slot behind.
pub fn merge_into(parent: &StoreNode, attrs: &mut TreeMap) {
    let parent_key = parent.name().to_lowercase();
    if is_terminal(&parent_key) {
        return;
    }

    for child in parent.children() {
        let child_key = child.name().to_lowercase();

        if matches!(attrs.get(&parent_key), Some(TreeValue::Leaf(_))) {
            if child.is_dir() {
                merge_into(child, attrs);
            } else {
                attrs.insert(child_key, leaf_of(child));
            }
            continue;
        }

        let slot = attrs
            .entry(parent_key.clone())
            .or_insert_with(|| TreeValue::Subtree(TreeMap::new()));

        if let TreeValue::Subtree(nested) = slot {
            if child.is_dir() {
                merge_into(child, nested);
            } else {
                nested.insert(child_key, leaf_of(child));
            }
        }
    }
}

fn leaf_of(node: &StoreNode) -> TreeValue {
    TreeValue::Leaf(node.value().unwrap_or_default().to_string())
}
