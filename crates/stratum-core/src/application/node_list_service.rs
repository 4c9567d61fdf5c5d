use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use stratum_state_store::{StateStore, StoreError, StoreNode};
use tracing::debug;

use crate::application::node_presenter::{present, NodeRecord};
use crate::domain::keys;
use crate::domain::tree::aggregate;
use crate::error::CoreResult;

/// Response of the node list query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeList {
    /// Registered nodes
    pub nodes: Vec<NodeRecord>,
    /// Known and referenced cluster ids
    pub clusters: Vec<String>,
}

impl NodeList {
    /// Node ids of every listed node
    pub fn node_ids(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter_map(NodeRecord::node_id)
            .map(str::to_string)
            .collect()
    }

    /// Attach monitoring stats to the nodes they describe.
    ///
    /// Each stat object carries a `node_id`; stats for unlisted nodes are
    /// dropped.
    pub fn attach_stats(&mut self, stats: Vec<Value>) {
        for stat in stats {
            let Some(node_id) = stat.get("node_id").and_then(Value::as_str) else {
                continue;
            };
            if let Some(node) = self.nodes.iter_mut().find(|n| n.node_id() == Some(node_id)) {
                node.stats = Some(stat);
            }
        }
    }
}

/// Builds the fleet view from the node registrations in the store
pub struct NodeListService {
    store: Arc<dyn StateStore>,
}

impl NodeListService {
    /// Create a new node list service
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// List registered nodes and known clusters.
    ///
    /// Absent `/nodes` or `/clusters` directories mean an empty fleet.
    pub async fn list(&self) -> CoreResult<NodeList> {
        let raw_nodes = match or_empty(self.store.get_recursive(keys::NODES_ROOT).await)? {
            Some(root) => root.children().iter().map(aggregate).collect(),
            None => Vec::new(),
        };

        let known_cluster_ids: Vec<String> = match or_empty(self.store.get(keys::CLUSTERS_ROOT).await)? {
            Some(root) => root.children().iter().map(|c| c.name().to_string()).collect(),
            None => Vec::new(),
        };

        let (nodes, clusters) = present(raw_nodes, &known_cluster_ids);
        debug!(nodes = nodes.len(), clusters = clusters.len(), "Built node list");

        Ok(NodeList { nodes, clusters })
    }
}

fn or_empty(result: Result<StoreNode, StoreError>) -> CoreResult<Option<StoreNode>> {
    match result {
        Ok(node) => Ok(Some(node)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stratum_state_store::InMemoryStateStore;

    #[tokio::test]
    async fn test_empty_store_lists_nothing() {
        let service = NodeListService::new(Arc::new(InMemoryStateStore::new()));
        let list = service.list().await.unwrap();

        assert!(list.nodes.is_empty());
        assert!(list.clusters.is_empty());
    }

    #[tokio::test]
    async fn test_list_from_store() {
        let store = InMemoryStateStore::with_entries(vec![
            ("/nodes/n1/NodeContext/node_id", "n1"),
            ("/nodes/n1/NodeContext/fqdn", "host-1"),
            ("/nodes/n1/NodeContext/tags", "[]"),
            ("/nodes/n1/TendrlContext/integration_id", "c1"),
            ("/nodes/n1/TendrlContext/node_id", "n1"),
            ("/nodes/n1/Definitions/data", "ignored"),
            ("/nodes/n2/TendrlContext/integration_id", "c2"),
            ("/clusters/c0/TendrlContext/integration_id", "c0"),
        ])
        .await;

        let list = NodeListService::new(Arc::new(store)).list().await.unwrap();

        assert_eq!(
            serde_json::to_value(&list).unwrap(),
            json!({
                "nodes": [{"fqdn": "host-1", "node_id": "n1", "cluster": {"integration_id": "c1"}}],
                "clusters": ["c0", "c1"]
            })
        );
    }

    #[test]
    fn test_attach_stats() {
        let record = |id: &str| NodeRecord {
            fields: json!({"node_id": id}).as_object().cloned().unwrap(),
            cluster: Default::default(),
            stats: None,
        };
        let mut list = NodeList {
            nodes: vec![record("n1"), record("n2")],
            clusters: vec![],
        };

        list.attach_stats(vec![
            json!({"node_id": "n2", "cpu": 12}),
            json!({"node_id": "ghost", "cpu": 1}),
            json!({"cpu": 3}),
        ]);

        assert_eq!(list.node_ids(), vec!["n1", "n2"]);
        assert!(list.nodes[0].stats.is_none());
        assert_eq!(list.nodes[1].stats, Some(json!({"node_id": "n2", "cpu": 12})));
    }
}
