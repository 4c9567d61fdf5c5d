//! Health check endpoints for the Stratum Server

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::server::StratumServer;

/// Liveness check
pub async fn ping() -> impl IntoResponse {
    Json(json!({"status": "Ok"}))
}

/// Health check handler
///
/// Reports the server version and the state of the state store. Answers 503
/// while the store is unreachable.
pub async fn health_check(State(server): State<Arc<StratumServer>>) -> impl IntoResponse {
    debug!("Health check requested");

    let store_status = match server.check_store_health().await {
        Ok(true) => "UP",
        Ok(false) => "DEGRADED",
        Err(_) => "DOWN",
    };

    let status = if store_status == "DOWN" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    let response = json!({
        "status": if status == StatusCode::OK { "UP" } else { "DOWN" },
        "version": env!("CARGO_PKG_VERSION"),
        "dependencies": {
            "stateStore": {"status": store_status},
        },
    });

    (status, Json(response))
}
