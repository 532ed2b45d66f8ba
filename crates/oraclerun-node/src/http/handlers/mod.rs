//! HTTP request handlers.

mod bridges;
mod health;
mod jobs;
mod runs;

pub use bridges::create_bridge_type;
pub use health::{health_check, metrics_handler};
pub use jobs::{create_job, create_job_run, get_job};
pub use runs::{get_job_run, update_job_run};
