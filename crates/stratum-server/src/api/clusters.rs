//! Fleet view and cluster lifecycle handlers

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::{actor_from_headers, errors::api_error_response};
use crate::error::{ServerError, ServerResult};
use crate::server::StratumServer;

fn parse_body(body: &Bytes) -> ServerResult<Value> {
    serde_json::from_slice(body).map_err(|e| ServerError::BadRequest(format!("Malformed JSON body: {}", e)))
}

fn accepted(result: ServerResult<stratum_core::JobId>) -> Response {
    match result {
        Ok(job_id) => (StatusCode::ACCEPTED, Json(json!({"job_id": job_id}))).into_response(),
        Err(err) => api_error_response(&err),
    }
}

/// List the flows declared in the compiled definitions
pub async fn list_flows_handler(State(server): State<Arc<StratumServer>>) -> Response {
    match server.list_flows().await {
        Ok(flows) => Json(json!({"flows": flows})).into_response(),
        Err(err) => api_error_response(&err),
    }
}

/// List registered nodes and known clusters
pub async fn node_list_handler(State(server): State<Arc<StratumServer>>) -> Response {
    match server.list_nodes().await {
        Ok(list) => Json(list).into_response(),
        Err(err) => api_error_response(&err),
    }
}

/// Queue an ImportCluster job
pub async fn import_cluster_handler(
    State(server): State<Arc<StratumServer>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let actor = actor_from_headers(&headers);
    info!(actor = %actor.0, "ImportCluster requested");

    let result = match parse_body(&body) {
        Ok(body) => server.import_cluster(&actor, &body).await,
        Err(err) => Err(err),
    };
    accepted(result)
}

/// Queue a CreateCluster job
pub async fn create_cluster_handler(
    State(server): State<Arc<StratumServer>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let actor = actor_from_headers(&headers);
    info!(actor = %actor.0, "CreateCluster requested");

    let result = match parse_body(&body) {
        Ok(body) => server.create_cluster(&actor, &body).await,
        Err(err) => Err(err),
    };
    accepted(result)
}
