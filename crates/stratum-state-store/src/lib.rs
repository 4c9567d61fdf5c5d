//! Stratum State Store
//!
//! Provides the abstraction over the hierarchical key-value store that holds
//! all fleet and job state. Agents write node registrations, detected
//! clusters and job results into it; the control plane reads those trees back
//! and publishes jobs into its queue namespace.
//!
//! The [`StateStore`] trait defines the contract. Backends:
//! - [`memory::InMemoryStateStore`] for development and tests
//! - [`etcd::EtcdStateStore`] speaking the etcd v2 keys API over HTTP
//! - [`timeout::TimeoutStateStore`] wrapping any backend with a bounded deadline

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A node of the hierarchical store: either a leaf holding a value or a
/// directory holding child nodes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreNode {
    /// Full key path, e.g. `/nodes/<uuid>/NodeContext/fqdn`
    pub key: String,

    /// Value of a leaf node, `None` for directories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Whether this node is a directory
    #[serde(default)]
    pub dir: bool,

    /// Children of a directory. Only populated one level deep unless the
    /// node was fetched recursively.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<StoreNode>,
}

impl StoreNode {
    /// Create a leaf node
    pub fn leaf(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            dir: false,
            nodes: Vec::new(),
        }
    }

    /// Create a directory node with the given children
    pub fn directory(key: impl Into<String>, nodes: Vec<StoreNode>) -> Self {
        Self {
            key: key.into(),
            value: None,
            dir: true,
            nodes,
        }
    }

    /// Last segment of the key path
    pub fn name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    /// Children of this node (empty for leaves)
    pub fn children(&self) -> &[StoreNode] {
        &self.nodes
    }

    /// Whether this node is a directory
    pub fn is_dir(&self) -> bool {
        self.dir
    }

    /// Value of a leaf, `None` for directories
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store operation timed out after {0}ms")]
    Timeout(u64),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Storage backend error: {0}")]
    BackendError(#[from] anyhow::Error), // Catch-all for backend-specific issues
}

impl StoreError {
    /// Whether the error is the "key not found" condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::KeyNotFound(_))
    }

    /// Whether the error is transient (store unreachable or timed out)
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}

/// Result type for StateStore operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait defining the contract for hierarchical key-value store implementations
#[async_trait]
pub trait StateStore: Send + Sync + std::fmt::Debug {
    /// Get a single node. Directories are returned with their direct children
    /// (without grandchildren).
    async fn get(&self, key: &str) -> StoreResult<StoreNode>;

    /// Get a node and its whole subtree
    async fn get_recursive(&self, key: &str) -> StoreResult<StoreNode>;

    /// Set a leaf value, creating intermediate directories as needed
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Health check
    async fn health_check(&self) -> StoreResult<bool> {
        Ok(true)
    }
}

/// Normalize a key to the `/a/b/c` form: leading slash, no trailing or
/// duplicate slashes.
pub fn normalize_key(key: &str) -> String {
    let segments: Vec<&str> = key.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

pub mod memory;
pub mod etcd;
pub mod timeout;

pub use etcd::EtcdStateStore;
pub use memory::InMemoryStateStore;
pub use timeout::TimeoutStateStore;
