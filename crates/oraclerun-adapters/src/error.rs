//! Error types for adapter resolution.

use oraclerun_core::{CoreError, TaskType};
use thiserror::Error;

/// Errors raised while turning a task spec into an adapter.
///
/// Failures while performing a task never surface here; they become errored
/// run outputs instead.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{0} is not a supported adapter type")]
    UnknownTaskType(TaskType),

    #[error("Invalid params for {task_type} adapter: {reason}")]
    InvalidParams { task_type: String, reason: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}
