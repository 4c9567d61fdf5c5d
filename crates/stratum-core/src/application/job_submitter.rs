use chrono::Utc;
use std::sync::Arc;
use stratum_state_store::StateStore;
use tracing::info;

use crate::domain::flow::FlowDescriptor;
use crate::domain::job::{Actor, Job, JobId};
use crate::domain::keys;
use crate::domain::parameters::ParameterSet;
use crate::error::{CoreResult, ValidationError};

/// Publishes jobs into the shared queue
#[derive(Clone)]
pub struct JobSubmitter {
    store: Arc<dyn StateStore>,
}

impl JobSubmitter {
    /// Create a new job submitter
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Queue a job running `flow` with `parameters`.
    ///
    /// Every mandatory input of the flow must be present and non-empty. The
    /// job is written in a single `set` under `/queue/<job_id>`; the call
    /// returns as soon as the write succeeds.
    pub async fn submit(&self, actor: &Actor, flow: &FlowDescriptor, parameters: ParameterSet) -> CoreResult<JobId> {
        let missing = flow.missing_inputs(&parameters);
        if !missing.is_empty() {
            return Err(ValidationError::Missing(missing).into());
        }

        let job = Job::new(actor, flow, parameters, Utc::now());
        let document = serde_json::to_string(&job)?;
        self.store.set(&keys::job(job.job_id.as_str()), &document).await?;

        info!(
            job_id = %job.job_id,
            flow = %flow.name,
            created_by = %actor.0,
            node_count = job.node_ids.len(),
            "Job queued"
        );

        Ok(job.job_id)
    }
}
