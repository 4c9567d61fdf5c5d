//! In-memory implementation of StateStore
//!
//! This implementation is primarily intended for testing and development purposes.

use crate::{normalize_key, StateStore, StoreError, StoreNode, StoreResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory implementation of StateStore
///
/// Only leaf values are stored; directories exist implicitly whenever a leaf
/// lives below them, the same way a path exists on a filesystem. Children are
/// returned ordered by key. All data is lost when the instance is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStateStore {
    leaves: Arc<RwLock<BTreeMap<String, String>>>,
}

impl InMemoryStateStore {
    /// Create a new in-memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `(key, value)` pairs
    pub async fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let store = Self::new();
        {
            let mut leaves = store.leaves.write().await;
            for (key, value) in entries {
                leaves.insert(normalize_key(key.as_ref()), value.into());
            }
        }
        store
    }

    /// Number of leaf values held
    pub async fn len(&self) -> usize {
        self.leaves.read().await.len()
    }

    /// Whether the store holds no values
    pub async fn is_empty(&self) -> bool {
        self.leaves.read().await.is_empty()
    }

    fn child_prefix(key: &str) -> String {
        if key == "/" {
            "/".to_string()
        } else {
            format!("{}/", key)
        }
    }

    /// Build the directory node for `key` from every leaf below it.
    fn build_directory(
        leaves: &BTreeMap<String, String>,
        key: &str,
        recursive: bool,
    ) -> Option<StoreNode> {
        let prefix = Self::child_prefix(key);
        let mut children: BTreeMap<String, bool> = BTreeMap::new();

        for leaf_key in leaves.keys().filter(|k| k.starts_with(&prefix)) {
            let rest = &leaf_key[prefix.len()..];
            match rest.split_once('/') {
                Some((segment, _)) => {
                    children.insert(segment.to_string(), true);
                }
                None => {
                    children.entry(rest.to_string()).or_insert(false);
                }
            }
        }

        if children.is_empty() {
            return None;
        }

        let nodes = children
            .into_iter()
            .map(|(segment, is_dir)| {
                let child_key = format!("{}{}", prefix, segment);
                if is_dir {
                    if recursive {
                        Self::build_directory(leaves, &child_key, true)
                            .unwrap_or_else(|| StoreNode::directory(child_key, Vec::new()))
                    } else {
                        StoreNode::directory(child_key, Vec::new())
                    }
                } else {
                    let value = leaves.get(&child_key).cloned().unwrap_or_default();
                    StoreNode::leaf(child_key, value)
                }
            })
            .collect();

        Some(StoreNode::directory(key.to_string(), nodes))
    }

    async fn lookup(&self, key: &str, recursive: bool) -> StoreResult<StoreNode> {
        let key = normalize_key(key);
        let leaves = self.leaves.read().await;

        if let Some(value) = leaves.get(&key) {
            return Ok(StoreNode::leaf(key, value.clone()));
        }

        Self::build_directory(&leaves, &key, recursive).ok_or(StoreError::KeyNotFound(key))
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, key: &str) -> StoreResult<StoreNode> {
        self.lookup(key, false).await
    }

    async fn get_recursive(&self, key: &str) -> StoreResult<StoreNode> {
        self.lookup(key, true).await
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let key = normalize_key(key);
        let mut leaves = self.leaves.write().await;

        // A leaf cannot shadow an existing directory
        let prefix = Self::child_prefix(&key);
        if leaves.keys().any(|k| k.starts_with(&prefix)) {
            return Err(StoreError::BackendError(anyhow::anyhow!(
                "Not a file: {} is a directory",
                key
            )));
        }

        leaves.insert(key.clone(), value.to_string());
        debug!(%key, "Set value in in-memory store");
        Ok(())
    }
}
