//! Key layout of the shared store
//!
//! Agents and the control plane agree on these paths; changing one breaks
//! every consumer on the other side.

/// Root of the per-node registrations
pub const NODES_ROOT: &str = "/nodes";

/// Root of the known clusters
pub const CLUSTERS_ROOT: &str = "/clusters";

/// Root of the job queue
pub const QUEUE_ROOT: &str = "/queue";

/// Compiled flow definitions published by the node agent
pub const DEFINITIONS_KEY: &str = "/_NS/node_agent/compiled_definitions/data";

/// Performance monitoring configuration
pub const MONITORING_CONFIG_KEY: &str = "/_tendrl/config/performance_monitoring";

/// Directory of a single node
pub fn node_dir(node_id: &str) -> String {
    format!("{}/{}", NODES_ROOT, node_id)
}

/// Detected cluster id recorded by the agent for a node
pub fn detected_cluster_id(node_id: &str) -> String {
    format!("{}/{}/DetectedCluster/detected_cluster_id", NODES_ROOT, node_id)
}

/// Index entry mapping a node IP to its UUID
pub fn ip_index(ip: &str) -> String {
    format!("/indexes/ip/{}", ip)
}

/// Queue entry of a job
pub fn job(job_id: &str) -> String {
    format!("{}/{}", QUEUE_ROOT, job_id)
}

/// Log stream of a job execution
pub fn job_logs(request_id: &str, log_type: &str) -> String {
    format!("/{}/{}", request_id, log_type)
}

/// Whether `segment` can be used as a single path segment
pub fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.contains('/') && segment != "." && segment != ".."
}
