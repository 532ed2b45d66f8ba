//! Job run handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap},
    Json,
};
use tracing::warn;

use oraclerun_core::{BridgeRunResult, JobRun, RunId};

use crate::http::responses::ApiError;
use crate::state::AppState;

/// Fetch a job run with its task runs.
pub async fn get_job_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobRun>, ApiError> {
    let run = state.store.find_job_run(&RunId::new(id)).await?;
    Ok(Json(run))
}

/// Bridge callback for a run waiting on a bridge.
pub async fn update_job_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<JobRun>, ApiError> {
    let run_id = RunId::new(id);

    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;
    if let Err(e) = state
        .run_manager
        .authenticate_bridge_callback(&run_id, token)
        .await
    {
        warn!(run_id = %run_id, error = %e, "Rejected bridge callback");
        return Err(e.into());
    }

    let result = BridgeRunResult::parse(&body)
        .map_err(|e| ApiError::bad_request(format!("Invalid bridge result: {e}")))?;

    let run = state
        .executor
        .resume_pending_bridge(&run_id, &result)
        .await?;
    Ok(Json(run))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}
