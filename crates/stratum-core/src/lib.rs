//!
//! Stratum Core - Job translation and fleet state aggregation
//!
//! This crate turns cluster lifecycle requests into normalized jobs published
//! on the shared queue, and rebuilds the fleet view (nodes, clusters) from the
//! agent-written trees in the state store. It holds no durable state; the
//! store is the single source of truth.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - store layout, trees, flows, nodes and jobs
pub mod domain;

/// Application services - translation, submission and queries
pub mod application;

/// Error types
pub mod error;

// Re-export key types
pub use error::{CoreError, CoreResult, ValidationError};

pub use domain::flow::{FlowCatalog, FlowDescriptor};
pub use domain::job::{Actor, Job, JobId, JobLogs, JobView};
pub use domain::node::{Node, NodeIdentifier, Resolution};
pub use domain::parameters::ParameterSet;
pub use domain::tree::{aggregate, TreeMap, TreeValue};

pub use application::cluster_service::ClusterService;
pub use application::job_query_service::JobQueryService;
pub use application::job_submitter::JobSubmitter;
pub use application::node_list_service::{NodeList, NodeListService};
pub use application::node_presenter::{present, NodeRecord};
pub use application::node_resolver::NodeResolver;
