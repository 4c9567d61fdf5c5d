use std::sync::Arc;
use stratum_state_store::StateStore;
use tracing::debug;

use crate::domain::keys;
use crate::domain::node::{Node, NodeIdentifier, Resolution};
use crate::error::CoreResult;

/// Resolves external node identifiers to registered nodes.
///
/// An identifier that matches no node is a normal [`Resolution::Absent`]
/// outcome; only store failures are errors.
#[derive(Clone)]
pub struct NodeResolver {
    store: Arc<dyn StateStore>,
}

impl NodeResolver {
    /// Create a new resolver over `store`
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Resolve `identifier` according to `mode`
    pub async fn resolve(&self, identifier: &str, mode: NodeIdentifier) -> CoreResult<Resolution> {
        let absent = || Resolution::Absent {
            identifier: identifier.to_string(),
        };

        if !keys::is_valid_segment(identifier) {
            return Ok(absent());
        }

        let uuid = match mode {
            NodeIdentifier::Uuid => identifier.to_string(),
            NodeIdentifier::Ip => match self.read_value(&keys::ip_index(identifier)).await? {
                Some(uuid) if keys::is_valid_segment(&uuid) => uuid,
                _ => {
                    debug!(ip = %identifier, "No node registered for IP");
                    return Ok(absent());
                }
            },
        };

        if self.node_exists(&uuid).await? {
            Ok(Resolution::Found(Node { uuid }))
        } else {
            Ok(absent())
        }
    }

    /// Whether a node directory exists for `node_id`
    pub async fn node_exists(&self, node_id: &str) -> CoreResult<bool> {
        if !keys::is_valid_segment(node_id) {
            return Ok(false);
        }
        match self.store.get(&keys::node_dir(node_id)).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Detected cluster id recorded for `node_id`, if any
    pub async fn detected_cluster_id(&self, node_id: &str) -> CoreResult<Option<String>> {
        if !keys::is_valid_segment(node_id) {
            return Ok(None);
        }
        self.read_value(&keys::detected_cluster_id(node_id)).await
    }

    async fn read_value(&self, key: &str) -> CoreResult<Option<String>> {
        match self.store.get(key).await {
            Ok(node) => Ok(node
                .value()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use stratum_state_store::{InMemoryStateStore, StoreError, StoreNode, StoreResult};

    async fn resolver() -> NodeResolver {
        let store = InMemoryStateStore::with_entries(vec![
            ("/nodes/n1/NodeContext/fqdn", "host-1"),
            ("/nodes/n1/DetectedCluster/detected_cluster_id", "c1"),
            ("/nodes/n2/NodeContext/fqdn", "host-2"),
            ("/indexes/ip/10.0.0.1", "n1"),
            ("/indexes/ip/10.0.0.3", "gone"),
        ])
        .await;
        NodeResolver::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_resolve_by_uuid() {
        let resolver = resolver().await;

        let found = resolver.resolve("n2", NodeIdentifier::Uuid).await.unwrap();
        assert_eq!(found, Resolution::Found(Node { uuid: "n2".to_string() }));

        let absent = resolver.resolve("n9", NodeIdentifier::Uuid).await.unwrap();
        assert!(!absent.exists());
    }

    #[tokio::test]
    async fn test_resolve_by_ip() {
        let resolver = resolver().await;

        let found = resolver.resolve("10.0.0.1", NodeIdentifier::Ip).await.unwrap();
        assert_eq!(found.node().map(|n| n.uuid.as_str()), Some("n1"));

        // Not indexed
        assert!(!resolver.resolve("10.0.0.2", NodeIdentifier::Ip).await.unwrap().exists());
        // Indexed but the node is gone
        assert!(!resolver.resolve("10.0.0.3", NodeIdentifier::Ip).await.unwrap().exists());
    }

    #[tokio::test]
    async fn test_malformed_identifiers_are_absent() {
        let resolver = resolver().await;

        for identifier in ["", "n1/NodeContext", ".."] {
            let resolution = resolver.resolve(identifier, NodeIdentifier::Uuid).await.unwrap();
            assert_eq!(
                resolution,
                Resolution::Absent {
                    identifier: identifier.to_string()
                }
            );
        }
    }

    #[tokio::test]
    async fn test_detected_cluster_id() {
        let resolver = resolver().await;

        assert_eq!(resolver.detected_cluster_id("n1").await.unwrap(), Some("c1".to_string()));
        assert_eq!(resolver.detected_cluster_id("n2").await.unwrap(), None);
    }

    #[derive(Debug)]
    struct DownStore;

    #[async_trait::async_trait]
    impl StateStore for DownStore {
        async fn get(&self, _key: &str) -> StoreResult<StoreNode> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn get_recursive(&self, key: &str) -> StoreResult<StoreNode> {
            self.get(key).await
        }

        async fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let resolver = NodeResolver::new(Arc::new(DownStore));

        let err = resolver.resolve("n1", NodeIdentifier::Uuid).await.unwrap_err();
        assert!(matches!(err, CoreError::StoreUnavailable(_)));
    }
}
