/// Node list record shaping
pub mod node_presenter;

/// Fleet view built from the store
pub mod node_list_service;

/// External node identifier resolution
pub mod node_resolver;

/// Request validation and parameter translation
pub mod cluster_translator;

/// Job queue publishing
pub mod job_submitter;

/// Job status and log queries
pub mod job_query_service;

/// Cluster lifecycle requests end to end
pub mod cluster_service;
