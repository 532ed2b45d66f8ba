//! oraclerun Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Storage
//! - Runtime specifics
//!
//! All types here represent the job pipeline domain: run statuses, run
//! results, job and task runs, bridges and ethereum value types.

pub mod bridge;
pub mod bridge_run_result;
pub mod error;
pub mod eth;
pub mod evm;
pub mod ids;
pub mod job;
pub mod json;
pub mod run_result;
pub mod status;

// Re-export commonly used types
pub use bridge::{BridgeType, BridgeTypeAuthentication, BridgeTypeRequest, TaskType};
pub use bridge_run_result::BridgeRunResult;
pub use error::CoreError;
pub use eth::{hash_from_hex, hex_hash, AttemptState, FunctionSelector, TxReceipt};
pub use evm::DataFormat;
pub use ids::{JobId, RunId, TaskRunId};
pub use job::{Initiator, InitiatorType, JobRun, JobSpec, RunRequest, TaskRun, TaskSpec};
pub use json::JsonData;
pub use run_result::{RunInput, RunOutput, RunResult};
pub use status::RunStatus;
