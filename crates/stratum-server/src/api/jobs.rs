//! Job status handlers

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::errors::api_error_response;
use crate::server::StratumServer;

/// Query parameters of the job logs endpoint
#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    /// Log stream, `all` when omitted
    #[serde(rename = "type")]
    pub log_type: Option<String>,
}

/// List jobs submitted through the API
pub async fn list_jobs_handler(State(server): State<Arc<StratumServer>>) -> Response {
    match server.list_jobs().await {
        Ok(jobs) => Json(jobs).into_response(),
        Err(err) => api_error_response(&err),
    }
}

/// Get a single job
pub async fn get_job_handler(
    State(server): State<Arc<StratumServer>>,
    Path(job_id): Path<String>,
) -> Response {
    match server.get_job(&job_id).await {
        Ok(job) => Json(job).into_response(),
        Err(err) => api_error_response(&err),
    }
}

/// Get the logs of a job
pub async fn job_logs_handler(
    State(server): State<Arc<StratumServer>>,
    Path(job_id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Response {
    match server.job_logs(&job_id, query.log_type.as_deref()).await {
        Ok(logs) => Json(json!({"job_id": job_id, "logs": logs.logs, "type": logs.log_type})).into_response(),
        Err(err) => api_error_response(&err),
    }
}
