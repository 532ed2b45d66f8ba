//! Job specifications, job runs and task runs.

use std::fmt;

use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    BridgeRunResult, JobId, JsonData, RunId, RunOutput, RunResult, RunStatus, TaskRunId, TaskType,
};

/// How a job run gets started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitiatorType {
    Web,
    RunLog,
    EthLog,
    Cron,
    RunAt,
}

/// Trigger attached to a job spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Initiator {
    #[serde(rename = "type")]
    pub initiator_type: InitiatorType,

    #[serde(default)]
    pub params: JsonData,
}

impl Initiator {
    pub fn new(initiator_type: InitiatorType) -> Self {
        Self {
            initiator_type,
            params: JsonData::new(),
        }
    }
}

/// Immutable description of one pipeline step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    #[serde(rename = "type")]
    pub task_type: TaskType,

    /// Minimum block confirmations before the task may start.
    #[serde(default)]
    pub confirmations: Option<u32>,

    /// Static adapter parameters.
    #[serde(default)]
    pub params: JsonData,
}

impl TaskSpec {
    pub fn new(task_type: TaskType) -> Self {
        Self {
            task_type,
            confirmations: None,
            params: JsonData::new(),
        }
    }

    /// Builder method to set params.
    pub fn with_params(mut self, params: JsonData) -> Self {
        self.params = params;
        self
    }

    /// Builder method to require confirmations.
    pub fn with_confirmations(mut self, confirmations: u32) -> Self {
        self.confirmations = Some(confirmations);
        self
    }
}

/// A job: initiators plus an ordered task pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    #[serde(default = "JobId::generate")]
    pub id: JobId,

    #[serde(default)]
    pub name: String,

    pub initiators: Vec<Initiator>,

    pub tasks: Vec<TaskSpec>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl JobSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: JobId::generate(),
            name: name.into(),
            initiators: Vec::new(),
            tasks: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Builder method to add an initiator.
    pub fn with_initiator(mut self, initiator: Initiator) -> Self {
        self.initiators.push(initiator);
        self
    }

    /// Builder method to append a task.
    pub fn with_task(mut self, task: TaskSpec) -> Self {
        self.tasks.push(task);
        self
    }

    /// Create an unstarted run with one task run per task spec.
    pub fn new_run(&self, initiator: Initiator, overrides: JsonData) -> JobRun {
        let run_id = RunId::generate();
        let now = Utc::now();

        let task_runs = self
            .tasks
            .iter()
            .map(|task| TaskRun {
                id: TaskRunId::generate(),
                job_run_id: run_id.clone(),
                result: RunResult::default(),
                status: RunStatus::Unstarted,
                task_spec: task.clone(),
                minimum_confirmations: task.confirmations,
                confirmations: None,
                created_at: now,
            })
            .collect();

        JobRun {
            id: run_id,
            job_id: self.id.clone(),
            result: RunResult {
                data: overrides.clone(),
                ..RunResult::default()
            },
            status: RunStatus::Unstarted,
            task_runs,
            created_at: now,
            finished_at: None,
            updated_at: now,
            initiator,
            creation_height: None,
            observed_height: None,
            overrides,
            payment: None,
            run_request: None,
        }
    }
}

/// Provenance of a run started by an on-chain request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub request_id: Option<String>,
    pub tx_hash: Option<B256>,
    pub block_hash: Option<B256>,
    pub requester: Option<Address>,
    pub payment: Option<U256>,
    pub created_at: DateTime<Utc>,
}

impl RunRequest {
    pub fn new() -> Self {
        Self {
            request_id: None,
            tx_hash: None,
            block_hash: None,
            requester: None,
            payment: None,
            created_at: Utc::now(),
        }
    }
}

impl Default for RunRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// One execution of a job spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRun {
    pub id: RunId,
    pub job_id: JobId,
    /// Aggregate result: output of the latest performed task.
    pub result: RunResult,
    pub status: RunStatus,
    pub task_runs: Vec<TaskRun>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub initiator: Initiator,
    pub creation_height: Option<u64>,
    pub observed_height: Option<u64>,
    /// Input the run was started with; fed to the first task.
    pub overrides: JsonData,
    pub payment: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_request: Option<RunRequest>,
}

impl JobRun {
    /// Position of the next task run that has not started.
    pub fn next_task_run_index(&self) -> Option<usize> {
        self.task_runs.iter().position(|tr| tr.status.can_start())
    }

    pub fn next_task_run(&self) -> Option<&TaskRun> {
        self.next_task_run_index().map(|i| &self.task_runs[i])
    }

    /// Task run just before the next runnable one, if any.
    pub fn previous_task_run(&self) -> Option<&TaskRun> {
        match self.next_task_run_index() {
            Some(i) if i > 0 => Some(&self.task_runs[i - 1]),
            _ => None,
        }
    }

    /// Returns true while some task run has not started.
    pub fn tasks_remain(&self) -> bool {
        self.next_task_run_index().is_some()
    }

    /// Position of the task run the pipeline stopped at: the first one that
    /// has not completed.
    pub fn first_unfinished_index(&self) -> Option<usize> {
        self.task_runs.iter().position(|tr| !tr.status.completed())
    }

    /// Input data for the task at `index`: the previous task's output (or
    /// the run overrides) with the task's own recorded data on top.
    pub fn task_input_data(&self, index: usize) -> JsonData {
        let base = match index.checked_sub(1) {
            Some(prev) => &self.task_runs[prev].result.data,
            None => &self.overrides,
        };
        base.merge(&self.task_runs[index].result.data)
    }

    /// Confirmations seen so far, or `None` when heights are unknown.
    pub fn confirmations(&self) -> Option<u32> {
        let created = self.creation_height?;
        let observed = self.observed_height.unwrap_or(created);
        let seen = observed.saturating_sub(created).saturating_add(1);
        Some(u32::try_from(seen).unwrap_or(u32::MAX))
    }

    /// Returns `(seen, required)` when the task at `index` must keep waiting
    /// for block confirmations.
    pub fn confirmations_shortfall(&self, index: usize) -> Option<(u32, u32)> {
        let required = self.task_runs[index].minimum_confirmations?;
        let seen = self.confirmations()?;
        (seen < required).then_some((seen, required))
    }

    /// Record an output as the job-level result.
    pub fn apply_output(&mut self, output: &RunOutput) {
        self.apply_result(output.clone().into_result());
    }

    /// Record a bridge callback as the job-level result.
    pub fn apply_bridge_run_result(&mut self, result: &BridgeRunResult) {
        self.apply_result(result.clone().into_run_result());
    }

    /// Mark the whole run as errored.
    pub fn set_error(&mut self, err: impl fmt::Display) {
        self.result.set_error(err);
        self.set_status(RunStatus::Errored);
    }

    fn apply_result(&mut self, result: RunResult) {
        let status = result.status;
        self.result = result;
        self.set_status(status);
    }

    /// Apply the job-level aggregation rule.
    ///
    /// A completed task with more task runs to go keeps the job in progress.
    pub fn set_status(&mut self, status: RunStatus) {
        self.status = status;
        if self.status.completed() && self.tasks_remain() {
            self.status = RunStatus::InProgress;
        } else if self.status.finished() {
            self.finished_at = Some(Utc::now());
        }
    }
}

/// Execution state of a single task within a job run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRun {
    pub id: TaskRunId,
    pub job_run_id: RunId,
    pub result: RunResult,
    pub status: RunStatus,
    #[serde(rename = "task")]
    pub task_spec: TaskSpec,
    pub minimum_confirmations: Option<u32>,
    pub confirmations: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl TaskRun {
    /// Copy an adapter output verbatim.
    pub fn apply_output(&mut self, output: &RunOutput) {
        self.result = output.clone().into_result();
        self.status = self.result.status;
    }

    /// Copy a bridge callback verbatim.
    pub fn apply_bridge_run_result(&mut self, result: &BridgeRunResult) {
        self.result = result.clone().into_run_result();
        self.status = self.result.status;
    }

    pub fn set_error(&mut self, err: impl fmt::Display) {
        self.result.set_error(err);
        self.status = self.result.status;
    }
}

impl fmt::Display for TaskRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TaskRun({},{},{},{})",
            self.id, self.task_spec.task_type, self.status, self.result
        )
    }
}
