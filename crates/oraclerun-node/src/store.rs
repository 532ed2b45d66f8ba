//! Persistence of jobs, bridge types and job runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use oraclerun_core::{BridgeType, JobId, JobRun, JobSpec, RunId, RunStatus, TaskType};

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Job run not found: {0}")]
    RunNotFound(RunId),

    #[error("Bridge type not found: {0}")]
    BridgeNotFound(TaskType),

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Persistence collaborator of the executor and run manager.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_job(&self, job: JobSpec) -> Result<(), StoreError>;

    async fn find_job(&self, id: &JobId) -> Result<JobSpec, StoreError>;

    async fn create_bridge_type(&self, bridge: BridgeType) -> Result<(), StoreError>;

    async fn find_bridge_type(&self, name: &TaskType) -> Result<BridgeType, StoreError>;

    async fn create_job_run(&self, run: JobRun) -> Result<(), StoreError>;

    async fn find_job_run(&self, id: &RunId) -> Result<JobRun, StoreError>;

    /// Replace a stored run, task runs included, and bump its `updated_at`.
    async fn save_job_run(&self, run: &mut JobRun) -> Result<(), StoreError>;

    async fn job_runs(&self) -> Result<Vec<JobRun>, StoreError>;

    /// Runs in any of `statuses`, oldest first.
    async fn job_runs_with_status(&self, statuses: &[RunStatus]) -> Result<Vec<JobRun>, StoreError> {
        let mut runs: Vec<JobRun> = self
            .job_runs()
            .await?
            .into_iter()
            .filter(|run| statuses.contains(&run.status))
            .collect();
        runs.sort_by_key(|run| run.created_at);
        Ok(runs)
    }

    /// Exclusive access to one run for a whole execution pass.
    async fn lock_run(&self, id: &RunId) -> RunLockGuard;
}

type RunLocks = Arc<StdMutex<HashMap<RunId, Arc<Mutex<()>>>>>;

/// Held for one execution pass over a run.
///
/// Dropping the last holder or waiter of a run's lock removes its entry.
pub struct RunLockGuard {
    id: RunId,
    locks: RunLocks,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RunLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.id);
        }
    }
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    jobs: RwLock<HashMap<JobId, JobSpec>>,
    bridge_types: RwLock<HashMap<TaskType, BridgeType>>,
    job_runs: RwLock<HashMap<RunId, JobRun>>,
    run_locks: RunLocks,
}

impl MemoryStore {
    /// Create a new MemoryStore wrapped in Arc.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of runs currently locked or waited on.
    pub fn locked_runs(&self) -> usize {
        self.run_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_job(&self, job: JobSpec) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::AlreadyExists {
                kind: "Job",
                id: job.id.to_string(),
            });
        }
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    async fn find_job(&self, id: &JobId) -> Result<JobSpec, StoreError> {
        self.jobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::JobNotFound(id.clone()))
    }

    async fn create_bridge_type(&self, bridge: BridgeType) -> Result<(), StoreError> {
        let mut bridges = self.bridge_types.write().await;
        if bridges.contains_key(&bridge.name) {
            return Err(StoreError::AlreadyExists {
                kind: "Bridge type",
                id: bridge.name.to_string(),
            });
        }
        bridges.insert(bridge.name.clone(), bridge);
        Ok(())
    }

    async fn find_bridge_type(&self, name: &TaskType) -> Result<BridgeType, StoreError> {
        self.bridge_types
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::BridgeNotFound(name.clone()))
    }

    async fn create_job_run(&self, run: JobRun) -> Result<(), StoreError> {
        let mut runs = self.job_runs.write().await;
        if runs.contains_key(&run.id) {
            return Err(StoreError::AlreadyExists {
                kind: "Job run",
                id: run.id.to_string(),
            });
        }
        runs.insert(run.id.clone(), run);
        Ok(())
    }

    async fn find_job_run(&self, id: &RunId) -> Result<JobRun, StoreError> {
        self.job_runs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::RunNotFound(id.clone()))
    }

    async fn save_job_run(&self, run: &mut JobRun) -> Result<(), StoreError> {
        let mut runs = self.job_runs.write().await;
        if !runs.contains_key(&run.id) {
            return Err(StoreError::RunNotFound(run.id.clone()));
        }
        run.updated_at = Utc::now();
        runs.insert(run.id.clone(), run.clone());
        Ok(())
    }

    async fn job_runs(&self) -> Result<Vec<JobRun>, StoreError> {
        Ok(self.job_runs.read().await.values().cloned().collect())
    }

    async fn lock_run(&self, id: &RunId) -> RunLockGuard {
        let lock = {
            let mut locks = self.run_locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(id.clone()).or_default().clone()
        };
        let mut held = RunLockGuard {
            id: id.clone(),
            locks: self.run_locks.clone(),
            guard: None,
        };
        held.guard = Some(lock.lock_owned().await);
        held
    }
}
