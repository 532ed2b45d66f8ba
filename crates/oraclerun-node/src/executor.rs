//! Drives job runs through their task pipelines.
//!
//! One pass holds the run lock, performs tasks in order and persists the run
//! after every task. A pass stops when a task reports a pending or errored
//! outcome, or when no task is left.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use oraclerun_adapters::{is_builtin, Adapter, AdapterKind, ExecutionContext};
use oraclerun_core::{BridgeRunResult, JobRun, RunId, RunInput, RunOutput, RunStatus, TaskSpec};

use crate::store::{Store, StoreError};

/// Executor errors.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Job run not found: {0}")]
    RunNotFound(RunId),

    #[error("Job run {id} is not runnable from status {status}")]
    RunNotRunnable { id: RunId, status: RunStatus },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Job executor.
pub struct JobExecutor {
    store: Arc<dyn Store>,
    ctx: ExecutionContext,
}

impl JobExecutor {
    /// Create a new JobExecutor.
    pub fn new(store: Arc<dyn Store>, ctx: ExecutionContext) -> Self {
        Self { store, ctx }
    }

    /// Advance a runnable job run as far as it will go.
    pub async fn execute(&self, id: &RunId) -> Result<JobRun, ExecutorError> {
        let _guard = self.store.lock_run(id).await;
        let mut run = self.load(id).await?;

        if !run.status.runnable() {
            return Err(ExecutorError::RunNotRunnable {
                id: run.id,
                status: run.status,
            });
        }

        self.run_pipeline(&mut run).await?;
        Ok(run)
    }

    /// Pick up a run waiting on confirmations or on the ethereum connection.
    ///
    /// The task the run stopped at is performed again with its own status as
    /// input, then the pipeline continues.
    pub async fn resume(&self, id: &RunId, block_height: Option<u64>) -> Result<JobRun, ExecutorError> {
        let _guard = self.store.lock_run(id).await;
        let mut run = self.load(id).await?;

        if !(run.status.pending_confirmations() || run.status.pending_connection()) {
            return Err(ExecutorError::RunNotRunnable {
                id: run.id,
                status: run.status,
            });
        }

        if let Some(height) = block_height {
            run.observed_height = Some(run.observed_height.map_or(height, |h| h.max(height)));
        }

        match run.first_unfinished_index() {
            Some(index) if !run.task_runs[index].status.unstarted() => {
                debug!(run_id = %run.id, task_index = index, "Resuming pending task run");
                self.perform_task(&mut run, index).await?;
            }
            Some(_) => run.set_status(RunStatus::InProgress),
            None => run.set_status(RunStatus::Completed),
        }

        self.run_pipeline(&mut run).await?;
        Ok(run)
    }

    /// Apply a bridge callback to the task run waiting on it and continue.
    pub async fn resume_pending_bridge(
        &self,
        id: &RunId,
        result: &BridgeRunResult,
    ) -> Result<JobRun, ExecutorError> {
        let _guard = self.store.lock_run(id).await;
        let mut run = self.load(id).await?;

        let index = match run.first_unfinished_index() {
            Some(index) if run.status.pending_bridge() => index,
            _ => {
                return Err(ExecutorError::RunNotRunnable {
                    id: run.id,
                    status: run.status,
                })
            }
        };

        info!(
            run_id = %run.id,
            task_index = index,
            status = ?result.status,
            "Applying bridge callback"
        );

        run.task_runs[index].apply_bridge_run_result(result);
        run.apply_bridge_run_result(result);
        self.store.save_job_run(&mut run).await?;

        self.run_pipeline(&mut run).await?;
        Ok(run)
    }

    async fn load(&self, id: &RunId) -> Result<JobRun, ExecutorError> {
        self.store.find_job_run(id).await.map_err(|e| match e {
            StoreError::RunNotFound(id) => ExecutorError::RunNotFound(id),
            other => ExecutorError::Store(other),
        })
    }

    async fn run_pipeline(&self, run: &mut JobRun) -> Result<(), ExecutorError> {
        while run.status.runnable() {
            let Some(index) = run.next_task_run_index() else {
                break;
            };

            if let Some((seen, required)) = run.confirmations_shortfall(index) {
                info!(
                    run_id = %run.id,
                    task_index = index,
                    confirmations = seen,
                    minimum_confirmations = required,
                    "Waiting for confirmations"
                );
                run.task_runs[index].confirmations = Some(seen);
                run.set_status(RunStatus::PendingConfirmations);
                self.store.save_job_run(run).await?;
                break;
            }

            self.perform_task(run, index).await?;
        }
        Ok(())
    }

    /// Perform the task run at `index`, record the output and save.
    async fn perform_task(&self, run: &mut JobRun, index: usize) -> Result<(), ExecutorError> {
        let task_run = &run.task_runs[index];
        let input = RunInput::new(
            run.id.clone(),
            task_run.id.clone(),
            run.task_input_data(index),
            task_run.status,
        );
        let spec = task_run.task_spec.clone();

        let output = match self.resolve(&spec).await? {
            Ok(adapter) => {
                debug!(run_id = %run.id, task_index = index, adapter = adapter.name(), "Performing task");
                self.perform(&adapter, &input).await
            }
            Err(e) => RunOutput::error(e),
        };

        if let Some(message) = output.error_message() {
            warn!(run_id = %run.id, task_index = index, error = %message, "Task run errored");
        } else {
            info!(
                run_id = %run.id,
                task_index = index,
                task_type = %spec.task_type,
                status = ?output.status(),
                "Task run finished"
            );
        }

        if let Some(seen) = run.confirmations() {
            run.task_runs[index].confirmations = Some(seen);
        }
        run.task_runs[index].apply_output(&output);
        run.apply_output(&output);
        self.store.save_job_run(run).await?;
        Ok(())
    }

    async fn resolve(
        &self,
        spec: &TaskSpec,
    ) -> Result<Result<AdapterKind, oraclerun_adapters::AdapterError>, StoreError> {
        let bridge = if is_builtin(&spec.task_type) {
            None
        } else {
            match self.store.find_bridge_type(&spec.task_type).await {
                Ok(bridge) => Some(bridge),
                Err(StoreError::BridgeNotFound(_)) => None,
                Err(e) => return Err(e),
            }
        };
        Ok(AdapterKind::for_task(spec, bridge.as_ref()))
    }

    async fn perform(&self, adapter: &AdapterKind, input: &RunInput) -> RunOutput {
        match AssertUnwindSafe(adapter.perform(input, &self.ctx))
            .catch_unwind()
            .await
        {
            Ok(output) => output,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(run_id = %input.job_run_id, adapter = adapter.name(), panic = %message, "Adapter panicked");
                RunOutput::error(format!("{} adapter panicked: {}", adapter.name(), message))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
