//! Deadline-bounded StateStore decorator
//!
//! Every call to the wrapped store is bounded by a fixed timeout. An expired
//! deadline surfaces as [`StoreError::Timeout`], which callers treat like an
//! unreachable store.

use crate::{StateStore, StoreError, StoreNode, StoreResult};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// StateStore wrapper that bounds each operation with a timeout
#[derive(Debug, Clone)]
pub struct TimeoutStateStore {
    /// Inner store implementation
    inner: Arc<dyn StateStore>,
    /// Deadline for each operation
    timeout: Duration,
}

impl TimeoutStateStore {
    /// Wrap `inner`, bounding each call by `timeout`
    pub fn new(inner: Arc<dyn StateStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// The configured deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T, F>(&self, operation: &str, key: &str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                let ms = self.timeout.as_millis() as u64;
                warn!(%operation, %key, timeout_ms = ms, "Store operation timed out");
                Err(StoreError::Timeout(ms))
            }
        }
    }
}

#[async_trait]
impl StateStore for TimeoutStateStore {
    async fn get(&self, key: &str) -> StoreResult<StoreNode> {
        self.bounded("get", key, self.inner.get(key)).await
    }

    async fn get_recursive(&self, key: &str) -> StoreResult<StoreNode> {
        self.bounded("get_recursive", key, self.inner.get_recursive(key)).await
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.bounded("set", key, self.inner.set(key, value)).await
    }

    async fn health_check(&self) -> StoreResult<bool> {
        self.bounded("health_check", "/", self.inner.health_check()).await
    }
}
