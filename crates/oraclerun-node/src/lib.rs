//! oraclerun Node Library
//!
//! This crate provides the node functionality for oraclerun: the run store,
//! the job executor, run creation, resumption of pending runs and the HTTP
//! API.

pub mod config;
pub mod executor;
pub mod http;
pub mod metrics;
pub mod resumer;
pub mod run_manager;
pub mod state;
pub mod store;

pub use config::Config;
pub use executor::{ExecutorError, JobExecutor};
pub use resumer::Resumer;
pub use run_manager::{RunManager, RunManagerError};
pub use state::AppState;
pub use store::{MemoryStore, RunLockGuard, Store, StoreError};
