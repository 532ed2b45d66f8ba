//! Job executor scenarios over the in-memory store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use oraclerun_adapters::{DisconnectedTxManager, ExecutionContext};
use oraclerun_core::{
    BridgeRunResult, BridgeType, BridgeTypeRequest, Initiator, InitiatorType, JobId, JobRun,
    JobSpec, JsonData, RunId, RunStatus, TaskSpec, TaskType,
};
use oraclerun_node::{
    ExecutorError, JobExecutor, MemoryStore, Resumer, RunLockGuard, RunManager, RunManagerError,
    Store, StoreError,
};

struct Node {
    store: Arc<MemoryStore>,
    executor: Arc<JobExecutor>,
    manager: RunManager,
}

fn node_with(ctx: ExecutionContext) -> Node {
    let store = MemoryStore::new();
    let executor = Arc::new(JobExecutor::new(store.clone(), ctx));
    let manager = RunManager::new(store.clone(), executor.clone());
    Node {
        store,
        executor,
        manager,
    }
}

fn node() -> Node {
    node_with(ExecutionContext::new(Arc::new(DisconnectedTxManager)))
}

fn task(name: &str) -> TaskSpec {
    TaskSpec::new(TaskType::new(name).unwrap())
}

fn web_job(tasks: Vec<TaskSpec>) -> JobSpec {
    tasks.into_iter().fold(
        JobSpec::new("test").with_initiator(Initiator::new(InitiatorType::Web)),
        JobSpec::with_task,
    )
}

fn data(value: serde_json::Value) -> JsonData {
    JsonData::from_value(value)
}

#[tokio::test]
async fn test_noop_then_nooppend() {
    let node = node();
    let job = node
        .manager
        .create_job(web_job(vec![task("noop"), task("nooppend")]))
        .await
        .unwrap();

    let run = node
        .manager
        .create_web_run(&job.id, data(json!({"result": "input"})))
        .await
        .unwrap();

    assert_eq!(run.task_runs[0].status, RunStatus::Completed);
    assert_eq!(run.task_runs[1].status, RunStatus::PendingConfirmations);
    assert_eq!(run.status, RunStatus::PendingConfirmations);
    assert!(run.finished_at.is_none());

    let stored = node.store.find_job_run(&run.id).await.unwrap();
    assert_eq!(stored.status, RunStatus::PendingConfirmations);
    assert_eq!(stored.task_runs[1].result.result_string().unwrap(), "input");
}

#[tokio::test]
async fn test_noop_pipeline_completes_in_one_pass() {
    let node = node();
    let job = node
        .manager
        .create_job(web_job(vec![task("noop"), task("noop"), task("noop")]))
        .await
        .unwrap();

    let run = node
        .manager
        .create_web_run(&job.id, data(json!({"result": "x"})))
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.task_runs.iter().all(|tr| tr.status == RunStatus::Completed));
    assert!(run.finished_at.is_some());
    assert_eq!(run.result.result_string().unwrap(), "x");
}

#[tokio::test]
async fn test_missing_run_is_not_found() {
    let node = node();
    let err = node.executor.execute(&RunId::new("missing")).await.unwrap_err();
    assert!(matches!(err, ExecutorError::RunNotFound(_)));

    let err = node.executor.resume(&RunId::new("missing"), None).await.unwrap_err();
    assert!(matches!(err, ExecutorError::RunNotFound(_)));
}

#[tokio::test]
async fn test_pending_run_is_not_runnable() {
    let node = node();
    let job = node
        .manager
        .create_job(web_job(vec![task("nooppend")]))
        .await
        .unwrap();
    let run = node.manager.create_web_run(&job.id, JsonData::new()).await.unwrap();
    assert_eq!(run.status, RunStatus::PendingConfirmations);

    let err = node.executor.execute(&run.id).await.unwrap_err();
    assert!(matches!(
        err,
        ExecutorError::RunNotRunnable {
            status: RunStatus::PendingConfirmations,
            ..
        }
    ));

    let bridge_result = BridgeRunResult::parse(br#"{"data":{"result":"1"}}"#).unwrap();
    let err = node
        .executor
        .resume_pending_bridge(&run.id, &bridge_result)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutorError::RunNotRunnable { .. }));
}

#[tokio::test]
async fn test_resume_reperforms_pending_task() {
    let node = node();
    let job = node
        .manager
        .create_job(web_job(vec![task("nooppend"), task("noop")]))
        .await
        .unwrap();
    let run = node
        .manager
        .create_web_run(&job.id, data(json!({"result": "r"})))
        .await
        .unwrap();

    let resumed = node.executor.resume(&run.id, Some(10)).await.unwrap();
    assert_eq!(resumed.status, RunStatus::PendingConfirmations);
    assert_eq!(resumed.task_runs[0].status, RunStatus::PendingConfirmations);
    assert_eq!(resumed.task_runs[1].status, RunStatus::Unstarted);
    assert_eq!(resumed.observed_height, Some(10));
}

#[tokio::test]
async fn test_confirmation_gating() {
    let node = node();
    let job = node
        .manager
        .create_job(web_job(vec![task("noop").with_confirmations(3)]))
        .await
        .unwrap();

    let run = node
        .manager
        .create_run(
            &job.id,
            Initiator::new(InitiatorType::RunLog),
            JsonData::new(),
            None,
            Some(100),
        )
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::PendingConfirmations);
    assert_eq!(run.task_runs[0].status, RunStatus::Unstarted);
    assert_eq!(run.task_runs[0].confirmations, Some(1));

    let run = node.executor.resume(&run.id, Some(101)).await.unwrap();
    assert_eq!(run.status, RunStatus::PendingConfirmations);
    assert_eq!(run.task_runs[0].confirmations, Some(2));

    let run = node.executor.resume(&run.id, Some(102)).await.unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.task_runs[0].confirmations, Some(3));
}

#[tokio::test]
async fn test_min_incoming_confirmations_applies_to_every_task() {
    let store = MemoryStore::new();
    let ctx = ExecutionContext::new(Arc::new(DisconnectedTxManager));
    let executor = Arc::new(JobExecutor::new(store.clone(), ctx));
    let manager = RunManager::new(store.clone(), executor).with_min_incoming_confirmations(2);

    let job = manager.create_job(web_job(vec![task("noop")])).await.unwrap();
    let run = manager
        .create_run(&job.id, Initiator::new(InitiatorType::RunLog), JsonData::new(), None, Some(5))
        .await
        .unwrap();
    assert_eq!(run.task_runs[0].minimum_confirmations, Some(2));
    assert_eq!(run.status, RunStatus::PendingConfirmations);
}

#[tokio::test]
async fn test_ethtx_without_connection_waits() {
    let node = node();
    let eth = task("ethtx").with_params(data(json!({
        "address": "0x0000000000000000000000000000000000000001",
        "functionSelector": "0x12345678"
    })));
    let job = node
        .manager
        .create_job(web_job(vec![task("noop"), eth]))
        .await
        .unwrap();

    let run = node
        .manager
        .create_web_run(&job.id, data(json!({"result": "0x2a"})))
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::PendingConnection);
    assert_eq!(run.task_runs[1].status, RunStatus::PendingConnection);

    let resumer = Resumer::new(node.store.clone(), node.executor.clone(), Duration::from_secs(1));
    assert_eq!(resumer.on_new_head(7).await, 1);

    let run = node.store.find_job_run(&run.id).await.unwrap();
    assert_eq!(run.status, RunStatus::PendingConnection);
    assert_eq!(run.observed_height, Some(7));
}

#[tokio::test]
async fn test_unresolvable_task_errors_the_run() {
    let node = node();
    let job = web_job(vec![task("noop"), task("vanished")]);
    node.store.create_job(job.clone()).await.unwrap();

    let run = job.new_run(Initiator::new(InitiatorType::Web), JsonData::new());
    node.store.create_job_run(run.clone()).await.unwrap();

    let run = node.executor.execute(&run.id).await.unwrap();
    assert_eq!(run.status, RunStatus::Errored);
    assert_eq!(run.task_runs[0].status, RunStatus::Completed);
    assert_eq!(run.task_runs[1].status, RunStatus::Errored);
    assert!(run.result.error().contains("vanished"));
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_create_job_rejects_unknown_task_types() {
    let node = node();
    let err = node
        .manager
        .create_job(web_job(vec![task("noop"), task("nosuchbridge")]))
        .await
        .unwrap_err();
    assert!(matches!(err, RunManagerError::Adapter(_)));

    let err = node.manager.create_job(web_job(vec![])).await.unwrap_err();
    assert!(matches!(err, RunManagerError::InvalidJob(_)));

    let err = node
        .manager
        .create_web_run(&JobId::new("missing"), JsonData::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RunManagerError::JobNotFound(_)));
}

#[tokio::test]
async fn test_bridge_pending_then_callback_resumes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pending": true})))
        .expect(1)
        .mount(&server)
        .await;

    let node = node();
    node.manager
        .create_bridge_type(BridgeTypeRequest {
            name: TaskType::new("randomNumber").unwrap(),
            url: server.uri(),
            confirmations: 0,
        })
        .await
        .unwrap();

    let job = node
        .manager
        .create_job(web_job(vec![task("randomNumber"), task("noop")]))
        .await
        .unwrap();
    let run = node
        .manager
        .create_web_run(&job.id, data(json!({"result": "seed"})))
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::PendingBridge);
    assert_eq!(run.task_runs[0].status, RunStatus::PendingBridge);

    let callback = BridgeRunResult::parse(br#"{"data":{"result":"42"}}"#).unwrap();
    let run = node
        .executor
        .resume_pending_bridge(&run.id, &callback)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.task_runs[0].status, RunStatus::Completed);
    assert_eq!(run.task_runs[1].status, RunStatus::Completed);
    assert_eq!(run.result.result_string().unwrap(), "42");
}

#[tokio::test]
async fn test_bridge_default_confirmations_gate_tasks() {
    let node = node();
    let auth = node
        .manager
        .create_bridge_type(BridgeTypeRequest {
            name: TaskType::new("slow").unwrap(),
            url: "http://127.0.0.1:1".to_string(),
            confirmations: 4,
        })
        .await
        .unwrap();
    assert_eq!(auth.name.as_str(), "slow");

    let job = node.manager.create_job(web_job(vec![task("slow")])).await.unwrap();
    let run = node
        .manager
        .create_run(&job.id, Initiator::new(InitiatorType::EthLog), JsonData::new(), None, Some(1))
        .await
        .unwrap();
    assert_eq!(run.task_runs[0].minimum_confirmations, Some(4));
    assert_eq!(run.status, RunStatus::PendingConfirmations);
}

/// Store whose saves can be made to fail.
struct FlakyStore {
    inner: Arc<MemoryStore>,
    fail_saves: AtomicBool,
}

#[async_trait]
impl Store for FlakyStore {
    async fn create_job(&self, job: JobSpec) -> Result<(), StoreError> {
        self.inner.create_job(job).await
    }

    async fn find_job(&self, id: &JobId) -> Result<JobSpec, StoreError> {
        self.inner.find_job(id).await
    }

    async fn create_bridge_type(&self, bridge: BridgeType) -> Result<(), StoreError> {
        self.inner.create_bridge_type(bridge).await
    }

    async fn find_bridge_type(&self, name: &TaskType) -> Result<BridgeType, StoreError> {
        self.inner.find_bridge_type(name).await
    }

    async fn create_job_run(&self, run: JobRun) -> Result<(), StoreError> {
        self.inner.create_job_run(run).await
    }

    async fn find_job_run(&self, id: &RunId) -> Result<JobRun, StoreError> {
        self.inner.find_job_run(id).await
    }

    async fn save_job_run(&self, run: &mut JobRun) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.inner.save_job_run(run).await
    }

    async fn job_runs(&self) -> Result<Vec<JobRun>, StoreError> {
        self.inner.job_runs().await
    }

    async fn lock_run(&self, id: &RunId) -> RunLockGuard {
        self.inner.lock_run(id).await
    }
}

#[tokio::test]
async fn test_store_failure_propagates() {
    let store = Arc::new(FlakyStore {
        inner: MemoryStore::new(),
        fail_saves: AtomicBool::new(true),
    });
    let executor = JobExecutor::new(
        store.clone(),
        ExecutionContext::new(Arc::new(DisconnectedTxManager)),
    );

    let job = web_job(vec![task("noop")]);
    store.create_job(job.clone()).await.unwrap();
    let run = job.new_run(Initiator::new(InitiatorType::Web), JsonData::new());
    store.create_job_run(run.clone()).await.unwrap();

    let err = executor.execute(&run.id).await.unwrap_err();
    assert!(matches!(err, ExecutorError::Store(StoreError::Backend(_))));

    let stored = store.find_job_run(&run.id).await.unwrap();
    assert_eq!(stored.status, RunStatus::Unstarted);

    store.fail_saves.store(false, Ordering::SeqCst);
    let run = executor.execute(&run.id).await.unwrap();
    assert_eq!(run.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_concurrent_executions_of_one_run_do_not_double_perform() {
    let node = node();
    let job = node
        .manager
        .create_job(web_job(vec![task("noop"), task("nooppend")]))
        .await
        .unwrap();
    let run = job.new_run(Initiator::new(InitiatorType::Web), JsonData::new());
    node.store.create_job_run(run.clone()).await.unwrap();

    let (first, second) = tokio::join!(
        node.executor.execute(&run.id),
        node.executor.execute(&run.id)
    );

    let outcomes = [first.is_ok(), second.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    let stored = node.store.find_job_run(&run.id).await.unwrap();
    assert_eq!(stored.status, RunStatus::PendingConfirmations);
    assert_eq!(node.store.locked_runs(), 0);
}
