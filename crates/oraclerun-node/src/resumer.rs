//! Background resumption of runs waiting on confirmations or on the
//! ethereum connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use oraclerun_core::RunStatus;

use crate::executor::{ExecutorError, JobExecutor};
use crate::store::Store;

const RESUMABLE: [RunStatus; 2] = [RunStatus::PendingConfirmations, RunStatus::PendingConnection];

/// Resumes pending runs on every tick and on every new block head.
pub struct Resumer {
    store: Arc<dyn Store>,
    executor: Arc<JobExecutor>,
    interval: Duration,
}

impl Resumer {
    /// Create a new Resumer.
    pub fn new(store: Arc<dyn Store>, executor: Arc<JobExecutor>, interval: Duration) -> Self {
        Self {
            store,
            executor,
            interval,
        }
    }

    /// Resume every pending run once. Returns how many were resumed.
    pub async fn resume_pending(&self, block_height: Option<u64>) -> usize {
        let runs = match self.store.job_runs_with_status(&RESUMABLE).await {
            Ok(runs) => runs,
            Err(e) => {
                error!(error = %e, "Failed to load pending job runs");
                return 0;
            }
        };

        let mut resumed = 0;
        for run in runs {
            match self.executor.resume(&run.id, block_height).await {
                Ok(run) => {
                    resumed += 1;
                    debug!(run_id = %run.id, status = ?run.status, "Job run resumed");
                }
                // Another pass got there first.
                Err(ExecutorError::RunNotRunnable { .. }) => {}
                Err(e) => error!(run_id = %run.id, error = %e, "Failed to resume job run"),
            }
        }
        resumed
    }

    /// Entry point for new block heads.
    pub async fn on_new_head(&self, height: u64) -> usize {
        debug!(height, "New head");
        self.resume_pending(Some(height)).await
    }

    /// Resume pending runs on a fixed interval, forever.
    pub async fn run(self: Arc<Self>) {
        info!(interval_secs = self.interval.as_secs(), "Starting resumer");
        let mut interval_timer = tokio::time::interval(self.interval);

        loop {
            interval_timer.tick().await;
            let resumed = self.resume_pending(None).await;
            if resumed > 0 {
                info!(resumed, "Resumed pending job runs");
            }
        }
    }

    /// Spawn [`Resumer::run`] on the runtime.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
