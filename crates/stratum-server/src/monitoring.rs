//! Client for the performance monitoring API
//!
//! The monitoring integration publishes its API endpoint in the state store.
//! When it is configured, node list responses carry per-node stats.

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use stratum_core::domain::keys;
use stratum_state_store::StateStore;
use tracing::debug;

use crate::error::{ServerError, ServerResult};

/// Monitoring API endpoint as published in the store
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MonitoringConfig {
    /// API host
    pub api_server_addr: String,
    /// API port
    pub api_server_port: u16,
}

impl MonitoringConfig {
    /// Read the monitoring configuration, `None` when monitoring is not set up
    pub async fn load(store: &dyn StateStore) -> ServerResult<Option<Self>> {
        let node = match store.get(keys::MONITORING_CONFIG_KEY).await {
            Ok(node) => node,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match node.value() {
            Some(document) if !document.trim().is_empty() => {
                let config = serde_yaml::from_str(document).map_err(|e| {
                    ServerError::MonitoringError(format!("Invalid monitoring configuration: {}", e))
                })?;
                Ok(Some(config))
            }
            _ => Ok(None),
        }
    }

    /// Base URL of the monitoring API
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.api_server_addr, self.api_server_port)
    }
}

/// HTTP client for the monitoring API
#[derive(Debug, Clone)]
pub struct MonitoringClient {
    client: Client,
}

impl MonitoringClient {
    /// Create a new client whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> ServerResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServerError::ConfigurationError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Stats of the given nodes, one object per node carrying its `node_id`
    pub async fn node_stats(&self, config: &MonitoringConfig, node_ids: &[String]) -> ServerResult<Vec<Value>> {
        if node_ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/monitoring/nodes", config.base_url());
        debug!(%url, nodes = node_ids.len(), "Fetching node stats");

        let response = self
            .client
            .get(&url)
            .query(&[("node_ids", node_ids.join(","))])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServerError::MonitoringError(format!(
                "Monitoring API returned status {}",
                status
            )));
        }

        match response.json::<Value>().await? {
            Value::Array(stats) => Ok(stats),
            other => Err(ServerError::MonitoringError(format!(
                "Unexpected monitoring response: {}",
                other
            ))),
        }
    }
}
