use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::domain::flow::FlowDescriptor;
use crate::domain::parameters::ParameterSet;

/// Status of a freshly queued job
pub const JOB_STATUS_NEW: &str = "new";

/// Job type consumed by node agents
pub const JOB_TYPE_NODE: &str = "node";

/// Provenance tag of jobs submitted through the API
pub const CREATED_FROM_API: &str = "API";

/// Identifier of a queued job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a fresh random job id
    pub fn generate() -> Self {
        JobId(Uuid::new_v4().to_string())
    }

    /// String form of the id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The user on whose behalf a job is submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor(pub String);

impl Actor {
    /// Actor recorded when the caller did not identify itself
    pub fn anonymous() -> Self {
        Actor("anonymous".to_string())
    }
}

impl Default for Actor {
    fn default() -> Self {
        Self::anonymous()
    }
}

/// Job document written into the queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job id, also the queue key
    pub job_id: JobId,
    /// Lifecycle status, `new` on submission
    pub status: String,
    /// Run target of the flow
    pub run: String,
    /// Flow name
    pub flow: String,
    /// Job kind, always `node`
    #[serde(rename = "type")]
    pub job_type: String,
    /// Target nodes, taken from `Node[]`
    pub node_ids: Vec<String>,
    /// Flow parameters
    pub parameters: ParameterSet,
    /// Submission time, RFC 3339 UTC with second precision
    pub created_at: String,
    /// Provenance tag
    pub created_from: String,
    /// Submitting actor
    pub created_by: Actor,
}

impl Job {
    /// Build a new job for `flow` with a freshly generated id
    pub fn new(actor: &Actor, flow: &FlowDescriptor, parameters: ParameterSet, now: DateTime<Utc>) -> Self {
        Self {
            job_id: JobId::generate(),
            status: JOB_STATUS_NEW.to_string(),
            run: flow.run.clone(),
            flow: flow.name.clone(),
            job_type: JOB_TYPE_NODE.to_string(),
            node_ids: parameters.node_ids(),
            parameters,
            created_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            created_from: CREATED_FROM_API.to_string(),
            created_by: actor.clone(),
        }
    }
}

/// Fields the control plane reads from a stored job document.
///
/// Agents rewrite the document as the job runs, so only these fields are
/// interpreted; the document itself is handed out unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JobView {
    /// Job id
    #[serde(default)]
    pub job_id: Option<String>,
    /// Provenance tag, `API` for jobs queued through this server
    #[serde(default)]
    pub created_from: Option<String>,
    /// Execution request id, prefix of the log keys
    #[serde(default)]
    pub request_id: Option<String>,
}

impl JobView {
    /// Read the interpreted fields of a job document
    pub fn of(document: &Value) -> Self {
        serde_json::from_value(document.clone()).unwrap_or_default()
    }

    /// Whether the job was submitted through the API
    pub fn is_from_api(&self) -> bool {
        self.created_from.as_deref() == Some(CREATED_FROM_API)
    }
}

/// Logs of a job execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobLogs {
    /// Raw log text
    pub logs: String,
    /// Log stream name
    #[serde(rename = "type")]
    pub log_type: String,
}
