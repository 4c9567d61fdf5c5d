//! Error handling for the Stratum Server API
//!
//! Every error response has the shape `{"errors": {...}}`. Validation
//! failures name the offending fields; internal failures are logged in full
//! and answered with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use stratum_core::{CoreError, ValidationError};
use tracing::{error, warn};

use crate::error::ServerError;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Status code and body for a server error
pub fn error_parts(err: &ServerError) -> (StatusCode, Value) {
    match err {
        ServerError::Core(CoreError::Validation(validation)) => validation_parts(validation),
        ServerError::Core(CoreError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            json!({"errors": {"message": err.to_string()}}),
        ),
        ServerError::Core(CoreError::StoreUnavailable(detail)) => {
            warn!(%detail, "State store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({"errors": {"message": "State store unavailable, retry later"}}),
            )
        }
        ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({"errors": {"message": msg}})),
        _ => {
            error!(error = %err, "Request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"errors": {"message": INTERNAL_MESSAGE}}),
            )
        }
    }
}

fn validation_parts(err: &ValidationError) -> (StatusCode, Value) {
    match err {
        ValidationError::Missing(fields) => (StatusCode::BAD_REQUEST, json!({"errors": {"missing": fields}})),
        ValidationError::Message(msg) => (StatusCode::BAD_REQUEST, json!({"errors": {"message": msg}})),
        ValidationError::Invalid(msg) => (StatusCode::BAD_REQUEST, json!({"errors": {"invalid": msg}})),
        ValidationError::UnavailableNodes(nodes) => (
            StatusCode::NOT_FOUND,
            json!({"errors": {"missing": nodes, "message": err.to_string()}}),
        ),
    }
}

/// Convert a server error into an API response
pub fn api_error_response(err: &ServerError) -> Response {
    let (status, body) = error_parts(err);
    (status, Json(body)).into_response()
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        api_error_response(&self)
    }
}
