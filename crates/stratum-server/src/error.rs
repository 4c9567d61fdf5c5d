//! Error types for the Stratum Server
//!
//! This module contains the error types used throughout the server.

use stratum_core::CoreError;
use stratum_state_store::StoreError;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    /// Error raised by a core service
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Request could not be read
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Monitoring backend error
    #[error("Monitoring error: {0}")]
    MonitoringError(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConfigurationError(msg) => ServerError::ConfigurationError(msg),
            other => ServerError::Core(other.into()),
        }
    }
}

impl From<serde_yaml::Error> for ServerError {
    fn from(err: serde_yaml::Error) -> Self {
        ServerError::ConfigurationError(format!("YAML error: {}", err))
    }
}

impl From<reqwest::Error> for ServerError {
    fn from(err: reqwest::Error) -> Self {
        ServerError::MonitoringError(format!("HTTP request error: {}", err))
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::InternalError(format!("IO error: {}", err))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::InternalError(format!("Error: {}", err))
    }
}

impl ServerError {
    /// Whether the caller may retry the request
    pub fn is_transient(&self) -> bool {
        matches!(self, ServerError::Core(err) if err.is_transient())
    }
}
