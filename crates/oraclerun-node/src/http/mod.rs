//! HTTP API of the node.
//!
//! Provides endpoints for:
//! - Job specs (`/v2/specs`) and web-initiated runs (`/v2/specs/:id/runs`)
//! - Job runs and bridge callbacks (`/v2/runs/:id`)
//! - Bridge registration (`/v2/bridge_types`)
//! - Health check (`/health`)
//! - Prometheus metrics (`/metrics`)

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod handlers;
pub mod responses;

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // API routes
        .route("/v2/specs", post(handlers::create_job))
        .route("/v2/specs/:id", get(handlers::get_job))
        .route("/v2/specs/:id/runs", post(handlers::create_job_run))
        .route(
            "/v2/runs/:id",
            get(handlers::get_job_run).patch(handlers::update_job_run),
        )
        .route("/v2/bridge_types", post(handlers::create_bridge_type))
        // Observability routes
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
