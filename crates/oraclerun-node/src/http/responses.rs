//! HTTP request and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::executor::ExecutorError;
use crate::run_manager::RunManagerError;
use crate::store::StoreError;

// ============================================================================
// Error types
// ============================================================================

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by API handlers, rendered as an [`ErrorResponse`].
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let status = match &e {
            StoreError::JobNotFound(_) | StoreError::RunNotFound(_) | StoreError::BridgeNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            StoreError::AlreadyExists { .. } => StatusCode::CONFLICT,
            StoreError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<ExecutorError> for ApiError {
    fn from(e: ExecutorError) -> Self {
        match e {
            ExecutorError::RunNotFound(_) => Self::new(StatusCode::NOT_FOUND, e.to_string()),
            ExecutorError::RunNotRunnable { .. } => Self::new(StatusCode::CONFLICT, e.to_string()),
            ExecutorError::Store(e) => e.into(),
        }
    }
}

impl From<RunManagerError> for ApiError {
    fn from(e: RunManagerError) -> Self {
        match e {
            RunManagerError::JobNotFound(_) => Self::new(StatusCode::NOT_FOUND, e.to_string()),
            RunManagerError::InvalidJob(_)
            | RunManagerError::InvalidBridge(_)
            | RunManagerError::Adapter(_) => Self::bad_request(e.to_string()),
            RunManagerError::InitiatorNotSupported { .. } => {
                Self::new(StatusCode::FORBIDDEN, e.to_string())
            }
            RunManagerError::Unauthorized(_) => Self::unauthorized(e.to_string()),
            RunManagerError::Store(e) => e.into(),
            RunManagerError::Executor(e) => e.into(),
        }
    }
}
