//!
//! Stratum Server - HTTP control plane for Stratum storage clusters
//!
//! This module exports all the components of the Stratum Server.

use std::sync::Arc;
use std::time::Duration;
use stratum_state_store::{EtcdStateStore, InMemoryStateStore, StateStore, TimeoutStateStore};

/// API module
pub mod api;

/// Server module
pub mod server;

/// Monitoring client module
pub mod monitoring;

/// Configuration module
pub mod config;

/// Error module
pub mod error;

// Re-export key types
pub use config::{LogFormat, ServerConfig, StoreConfig};
pub use error::{ServerError, ServerResult};
pub use server::StratumServer;

/// Run function
pub async fn run(config: ServerConfig) -> ServerResult<()> {
    // Initialize logging
    init_logging(&config);

    // Create dependencies
    let store = create_state_store(&config)?;

    // Create and run server
    let server = StratumServer::new(config, store)?;
    server.run().await
}

/// Initialize logging
pub fn init_logging(config: &ServerConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    // Create filter based on config
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // Initialize subscriber; a subscriber installed earlier wins
    let result = match config.log_format {
        LogFormat::Json => fmt().json().with_env_filter(filter).with_target(true).try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };
    if result.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
}

/// Create the state store client, bounded by the configured timeout
pub fn create_state_store(config: &ServerConfig) -> ServerResult<Arc<dyn StateStore>> {
    let timeout = Duration::from_millis(config.store.timeout_ms);
    let url = &config.store.url;

    let base_store: Arc<dyn StateStore> = if url.starts_with("memory://") {
        // Use in-memory store for development and testing
        tracing::info!("Using in-memory state store");
        Arc::new(InMemoryStateStore::new())
    } else if url.starts_with("http://") || url.starts_with("https://") {
        tracing::info!(%url, "Using etcd state store");
        let store = EtcdStateStore::new(
            url.clone(),
            config.store.user_name.clone(),
            config.store.password.clone(),
            timeout,
        )?;
        Arc::new(store)
    } else {
        return Err(ServerError::ConfigurationError(format!("Unsupported store URL: {}", url)));
    };

    Ok(Arc::new(TimeoutStateStore::new(base_store, timeout)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_state_store() {
        let mut config = ServerConfig::default();

        config.store.url = "memory://test".to_string();
        assert!(create_state_store(&config).is_ok());

        config.store.url = "http://127.0.0.1:2379".to_string();
        assert!(create_state_store(&config).is_ok());

        config.store.url = "consul://localhost".to_string();
        assert!(matches!(
            create_state_store(&config),
            Err(ServerError::ConfigurationError(_))
        ));
    }
}
