//! API module for the Stratum Server
//!
//! This module contains the API routes and handlers for the Stratum Server.

use axum::{
    http::{header, HeaderMap, HeaderName, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use stratum_core::Actor;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod clusters;
pub mod errors;
pub mod health;
pub mod jobs;

use crate::server::StratumServer;

/// Header naming the user on whose behalf a request is made
pub const ACTOR_HEADER: &str = "x-stratum-user";

/// Build the router for API endpoints
pub fn build_router(server: Arc<StratumServer>) -> Router {
    Router::new()
        // Fleet view and cluster lifecycle
        .route("/Flows", get(clusters::list_flows_handler))
        .route("/GetNodeList", get(clusters::node_list_handler))
        .route("/ImportCluster", post(clusters::import_cluster_handler))
        .route("/CreateCluster", post(clusters::create_cluster_handler))

        // Job status
        .route("/jobs", get(jobs::list_jobs_handler))
        .route("/jobs/:job_id", get(jobs::get_job_handler))
        .route("/jobs/:job_id/logs", get(jobs::job_logs_handler))

        // Health check
        .route("/ping", get(health::ping))
        .route("/health", get(health::health_check))

        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())

        // Shared state
        .with_state(server)
}

/// CORS policy: any origin, the methods and headers browsers send to the API
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS, Method::PUT, Method::DELETE])
        .allow_headers([
            HeaderName::from_static("origin"),
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
}

/// Actor named by the request headers, anonymous when absent
pub fn actor_from_headers(headers: &HeaderMap) -> Actor {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|user| !user.is_empty())
        .map(|user| Actor(user.to_string()))
        .unwrap_or_default()
}
