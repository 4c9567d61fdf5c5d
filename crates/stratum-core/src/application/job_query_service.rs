use serde_json::Value;
use std::sync::Arc;
use stratum_state_store::StateStore;
use tracing::{debug, warn};

use crate::domain::job::{JobLogs, JobView};
use crate::domain::keys;
use crate::error::{CoreError, CoreResult, ValidationError};

/// Log stream returned when the caller names none
pub const DEFAULT_LOG_TYPE: &str = "all";

/// Read-only access to queued jobs and their logs
pub struct JobQueryService {
    store: Arc<dyn StateStore>,
}

impl JobQueryService {
    /// Create a new job query service
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Stored documents of the jobs submitted through the API. Unreadable
    /// documents are skipped.
    pub async fn list(&self) -> CoreResult<Vec<Value>> {
        let queue = match self.store.get_recursive(keys::QUEUE_ROOT).await {
            Ok(queue) => queue,
            Err(err) if err.is_not_found() => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut jobs = Vec::new();
        for entry in queue.children() {
            let Some(document) = entry.value() else {
                debug!(key = %entry.key, "Skipping non-document queue entry");
                continue;
            };
            match serde_json::from_str::<Value>(document) {
                Ok(job) if JobView::of(&job).is_from_api() => jobs.push(job),
                Ok(_) => {}
                Err(err) => warn!(job_id = %entry.name(), error = %err, "Skipping unreadable job document"),
            }
        }

        Ok(jobs)
    }

    /// Stored document of a single job, as the agents left it
    pub async fn get(&self, job_id: &str) -> CoreResult<Value> {
        let not_found = || CoreError::NotFound(format!("Job {}", job_id));

        if !keys::is_valid_segment(job_id) {
            return Err(not_found());
        }

        let entry = self.store.get(&keys::job(job_id)).await.map_err(|err| {
            if err.is_not_found() {
                not_found()
            } else {
                err.into()
            }
        })?;

        let document = entry.value().ok_or_else(not_found)?;
        Ok(serde_json::from_str(document)?)
    }

    /// Logs of a job's execution, `all` unless `log_type` names a stream
    pub async fn logs(&self, job_id: &str, log_type: Option<&str>) -> CoreResult<JobLogs> {
        let log_type = log_type.unwrap_or(DEFAULT_LOG_TYPE);
        if !keys::is_valid_segment(log_type) {
            return Err(ValidationError::Invalid(format!("Invalid log type '{}'", log_type)).into());
        }

        let job = self.get(job_id).await?;
        let not_found = || CoreError::NotFound(format!("Logs of job {}", job_id));

        let request_id = JobView::of(&job).request_id.filter(|id| !id.is_empty()).ok_or_else(not_found)?;
        let entry = self
            .store
            .get(&keys::job_logs(&request_id, log_type))
            .await
            .map_err(|err| if err.is_not_found() { not_found() } else { err.into() })?;

        Ok(JobLogs {
            logs: entry.value().unwrap_or_default().to_string(),
            log_type: log_type.to_string(),
        })
    }
}
