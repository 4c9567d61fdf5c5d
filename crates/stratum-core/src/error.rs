use stratum_state_store::StoreError;
use thiserror::Error;

/// A caller-supplied payload failed a precondition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required fields are absent or empty. Lists every one of them.
    #[error("Missing parameters: {}", .0.join(", "))]
    Missing(Vec<String>),

    /// A field is present but unusable
    #[error("{0}")]
    Message(String),

    /// A field holds a value outside its allowed set
    #[error("{0}")]
    Invalid(String),

    /// Node identifiers that could not be resolved to registered nodes
    #[error("Unavailable nodes: {}.", .0.join(", "))]
    UnavailableNodes(Vec<String>),
}

/// Core error type for the Stratum control plane
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Referenced entity does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Backing store unreachable or timed out
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Malformed document read from the store
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Any other unexpected condition
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether a caller may retry the operation
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::StoreUnavailable(_))
    }
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::KeyNotFound(key) => {
                tracing::debug!(%key, "Store key not found");
                CoreError::NotFound("Resource".to_string())
            }
            StoreError::Unavailable(msg) => CoreError::StoreUnavailable(msg),
            StoreError::Timeout(ms) => {
                CoreError::StoreUnavailable(format!("store did not answer within {}ms", ms))
            }
            StoreError::SerializationError(e) => CoreError::SerializationError(e.to_string()),
            other => CoreError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for CoreError {
    fn from(err: serde_yaml::Error) -> Self {
        CoreError::SerializationError(format!("YAML error: {}", err))
    }
}
