//! Creation of jobs, bridges and job runs.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use oraclerun_adapters::{is_builtin, AdapterError, AdapterKind};
use oraclerun_core::{
    BridgeType, BridgeTypeAuthentication, BridgeTypeRequest, Initiator, InitiatorType, JobId,
    JobRun, JobSpec, JsonData, RunId, RunRequest,
};

use crate::executor::{ExecutorError, JobExecutor};
use crate::store::{Store, StoreError};

/// Run manager errors.
#[derive(Debug, Error)]
pub enum RunManagerError {
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Invalid bridge type: {0}")]
    InvalidBridge(String),

    #[error("Job {job_id} has no {initiator_type:?} initiator")]
    InitiatorNotSupported {
        job_id: JobId,
        initiator_type: InitiatorType,
    },

    #[error("Unauthorized bridge callback for run {0}")]
    Unauthorized(RunId),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// Entry point for everything that creates work.
pub struct RunManager {
    store: Arc<dyn Store>,
    executor: Arc<JobExecutor>,
    min_incoming_confirmations: u32,
}

impl RunManager {
    /// Create a new RunManager.
    pub fn new(store: Arc<dyn Store>, executor: Arc<JobExecutor>) -> Self {
        Self {
            store,
            executor,
            min_incoming_confirmations: 0,
        }
    }

    /// Builder method to set a node-wide confirmation floor for every task.
    pub fn with_min_incoming_confirmations(mut self, confirmations: u32) -> Self {
        self.min_incoming_confirmations = confirmations;
        self
    }

    /// Validate and store a job.
    ///
    /// Every task type must be a builtin adapter with valid params or a
    /// registered bridge.
    pub async fn create_job(&self, job: JobSpec) -> Result<JobSpec, RunManagerError> {
        if job.initiators.is_empty() {
            return Err(RunManagerError::InvalidJob("job has no initiators".to_string()));
        }
        if job.tasks.is_empty() {
            return Err(RunManagerError::InvalidJob("job has no tasks".to_string()));
        }

        for task in &job.tasks {
            let bridge = if is_builtin(&task.task_type) {
                None
            } else {
                match self.store.find_bridge_type(&task.task_type).await {
                    Ok(bridge) => Some(bridge),
                    Err(StoreError::BridgeNotFound(_)) => None,
                    Err(e) => return Err(e.into()),
                }
            };
            AdapterKind::for_task(task, bridge.as_ref())?;
        }

        self.store.create_job(job.clone()).await?;
        info!(job_id = %job.id, tasks = job.tasks.len(), "Job created");
        Ok(job)
    }

    /// Register a bridge; the returned tokens are not retrievable later.
    pub async fn create_bridge_type(
        &self,
        request: BridgeTypeRequest,
    ) -> Result<BridgeTypeAuthentication, RunManagerError> {
        if is_builtin(&request.name) {
            return Err(RunManagerError::InvalidBridge(format!(
                "{} is a builtin adapter",
                request.name
            )));
        }
        if request.url.trim().is_empty() {
            return Err(RunManagerError::InvalidBridge("url is required".to_string()));
        }

        let (bridge, auth) = BridgeType::new(request);
        info!(bridge = %bridge.name, url = %bridge.url, "Bridge type registered");
        self.store.create_bridge_type(bridge).await?;
        Ok(auth)
    }

    /// Start a run from the job's web initiator.
    pub async fn create_web_run(
        &self,
        job_id: &JobId,
        input: JsonData,
    ) -> Result<JobRun, RunManagerError> {
        let job = self.find_job(job_id).await?;
        let initiator = job
            .initiators
            .iter()
            .find(|i| i.initiator_type == InitiatorType::Web)
            .cloned()
            .ok_or_else(|| RunManagerError::InitiatorNotSupported {
                job_id: job_id.clone(),
                initiator_type: InitiatorType::Web,
            })?;
        self.create_run(job_id, initiator, input, None, None).await
    }

    /// Build a run, persist it and execute it as far as it goes.
    pub async fn create_run(
        &self,
        job_id: &JobId,
        initiator: Initiator,
        input: JsonData,
        run_request: Option<RunRequest>,
        creation_height: Option<u64>,
    ) -> Result<JobRun, RunManagerError> {
        let job = self.find_job(job_id).await?;
        let mut run = job.new_run(initiator, input);
        run.creation_height = creation_height;
        run.observed_height = creation_height;
        if let Some(request) = run_request {
            run.payment = request.payment;
            run.run_request = Some(request);
        }

        for task_run in &mut run.task_runs {
            let bridge_minimum = if is_builtin(&task_run.task_spec.task_type) {
                0
            } else {
                match self.store.find_bridge_type(&task_run.task_spec.task_type).await {
                    Ok(bridge) => bridge.confirmations,
                    Err(StoreError::BridgeNotFound(_)) => 0,
                    Err(e) => return Err(e.into()),
                }
            };
            let minimum = task_run
                .task_spec
                .confirmations
                .unwrap_or(0)
                .max(bridge_minimum)
                .max(self.min_incoming_confirmations);
            task_run.minimum_confirmations = (minimum > 0).then_some(minimum);
        }

        info!(
            run_id = %run.id,
            job_id = %job.id,
            initiator = ?run.initiator.initiator_type,
            "Job run created"
        );
        self.store.create_job_run(run.clone()).await?;

        Ok(self.executor.execute(&run.id).await?)
    }

    /// Check the bearer token of a bridge callback against the bridge the
    /// run is waiting on.
    pub async fn authenticate_bridge_callback(
        &self,
        run_id: &RunId,
        token: &str,
    ) -> Result<(), RunManagerError> {
        let run = self.store.find_job_run(run_id).await?;
        let task_type = run
            .first_unfinished_index()
            .map(|index| run.task_runs[index].task_spec.task_type.clone())
            .ok_or_else(|| RunManagerError::Unauthorized(run_id.clone()))?;

        match self.store.find_bridge_type(&task_type).await {
            Ok(bridge) if bridge.authenticate(token) => Ok(()),
            Ok(_) | Err(StoreError::BridgeNotFound(_)) => {
                Err(RunManagerError::Unauthorized(run_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_job(&self, job_id: &JobId) -> Result<JobSpec, RunManagerError> {
        self.store.find_job(job_id).await.map_err(|e| match e {
            StoreError::JobNotFound(id) => RunManagerError::JobNotFound(id),
            other => other.into(),
        })
    }
}
