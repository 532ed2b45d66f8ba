//! Bridge type registration handler.

use std::sync::Arc;

use axum::{extract::State, Json};

use oraclerun_core::{BridgeTypeAuthentication, BridgeTypeRequest};

use crate::http::responses::ApiError;
use crate::state::AppState;

/// Register a bridge and hand back its tokens.
pub async fn create_bridge_type(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BridgeTypeRequest>,
) -> Result<Json<BridgeTypeAuthentication>, ApiError> {
    let auth = state.run_manager.create_bridge_type(request).await?;
    Ok(Json(auth))
}
