//! Job spec handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use tracing::info;

use oraclerun_core::{JobId, JobRun, JobSpec, JsonData};

use crate::http::responses::ApiError;
use crate::state::AppState;

/// Create a job from its JSON spec.
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(job): Json<JobSpec>,
) -> Result<Json<JobSpec>, ApiError> {
    let job = state.run_manager.create_job(job).await?;
    Ok(Json(job))
}

/// Fetch a job spec.
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobSpec>, ApiError> {
    let job = state.store.find_job(&JobId::new(id)).await?;
    Ok(Json(job))
}

/// Start a web-initiated run; the request body, if any, is the run input.
pub async fn create_job_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<JobRun>, ApiError> {
    let input = if body.iter().all(u8::is_ascii_whitespace) {
        JsonData::new()
    } else {
        let text = std::str::from_utf8(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid request body: {e}")))?;
        JsonData::parse(text).map_err(|e| ApiError::bad_request(e.to_string()))?
    };

    let job_id = JobId::new(id);
    info!(job_id = %job_id, "Web run requested");
    let run = state.run_manager.create_web_run(&job_id, input).await?;
    Ok(Json(run))
}
