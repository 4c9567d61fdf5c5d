use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::tree::{tree_map_to_json, TreeMap, TreeValue};

const NODE_CONTEXT: &str = "nodecontext";
const TENDRL_CONTEXT: &str = "tendrlcontext";

/// Node context fields never listed: `tags` plus the keys the record sets itself
const HIDDEN_NODE_FIELDS: &[&str] = &["tags", "cluster", "stats"];

/// A node as shown in the node list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRecord {
    /// Fields of the node's `nodecontext` group
    #[serde(flatten)]
    pub fields: Map<String, Value>,

    /// The node's `tendrlcontext` group without its `node_id`
    pub cluster: Map<String, Value>,

    /// Monitoring stats, when a monitoring backend is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Value>,
}

impl NodeRecord {
    /// The node id recorded in the node context
    pub fn node_id(&self) -> Option<&str> {
        self.fields.get("node_id").and_then(Value::as_str)
    }

    /// Cluster id the node belongs to: `integration_id`, else `cluster_id`
    pub fn cluster_id(&self) -> Option<&str> {
        ["integration_id", "cluster_id"]
            .iter()
            .filter_map(|field| self.cluster.get(*field).and_then(Value::as_str))
            .find(|id| !id.is_empty())
    }
}

/// Shape aggregated node trees into node list records and reconcile the
/// cluster list.
///
/// Each raw record maps a node UUID to its aggregated groups. Only the
/// `nodecontext` and `tendrlcontext` groups are kept. Nodes without a
/// `nodecontext` are not registered yet and are skipped. Output order follows
/// the input.
///
/// The cluster list is the union of `known_cluster_ids` (first, deduplicated)
/// and the clusters referenced by the presented nodes.
pub fn present(raw_nodes: Vec<TreeMap>, known_cluster_ids: &[String]) -> (Vec<NodeRecord>, Vec<String>) {
    let mut nodes = Vec::new();

    for raw in raw_nodes {
        for (_, attributes) in raw {
            let TreeValue::Subtree(mut groups) = attributes else {
                continue;
            };
            groups.retain(|group, _| group == NODE_CONTEXT || group == TENDRL_CONTEXT);

            let mut fields = match groups.remove(NODE_CONTEXT) {
                Some(TreeValue::Subtree(context)) if !context.is_empty() => tree_map_to_json(&context),
                _ => continue,
            };
            fields.retain(|field, _| !HIDDEN_NODE_FIELDS.contains(&field.as_str()));

            let cluster = match groups.remove(TENDRL_CONTEXT) {
                Some(TreeValue::Subtree(context)) => {
                    let mut cluster = tree_map_to_json(&context);
                    cluster.retain(|field, _| field != "node_id");
                    cluster
                }
                _ => Map::new(),
            };

            nodes.push(NodeRecord {
                fields,
                cluster,
                stats: None,
            });
        }
    }

    let mut clusters: Vec<String> = Vec::new();
    let referenced = nodes.iter().filter_map(NodeRecord::cluster_id).map(str::to_string);
    for id in known_cluster_ids.iter().cloned().chain(referenced) {
        if !clusters.contains(&id) {
            clusters.push(id);
        }
    }

    (nodes, clusters)
}
