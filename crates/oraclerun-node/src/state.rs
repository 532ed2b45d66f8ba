//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use oraclerun_adapters::ExecutionContext;

use crate::executor::JobExecutor;
use crate::resumer::Resumer;
use crate::run_manager::RunManager;
use crate::store::Store;

/// Shared application state.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub executor: Arc<JobExecutor>,
    pub run_manager: RunManager,
    pub resumer: Arc<Resumer>,
}

impl AppState {
    /// Wire the executor, run manager and resumer around `store`.
    pub fn new(
        store: Arc<dyn Store>,
        ctx: ExecutionContext,
        min_incoming_confirmations: u32,
        resume_interval: Duration,
    ) -> Arc<Self> {
        let executor = Arc::new(JobExecutor::new(store.clone(), ctx));
        let run_manager = RunManager::new(store.clone(), executor.clone())
            .with_min_incoming_confirmations(min_incoming_confirmations);
        let resumer = Arc::new(Resumer::new(store.clone(), executor.clone(), resume_interval));

        Arc::new(Self {
            store,
            executor,
            run_manager,
            resumer,
        })
    }
}
