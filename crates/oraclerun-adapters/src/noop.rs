//! Adapters that do nothing, used for wiring and tests.

use async_trait::async_trait;
use oraclerun_core::{RunInput, RunOutput};

use crate::adapter::{Adapter, ExecutionContext};

/// Completes immediately with its input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoOp;

#[async_trait]
impl Adapter for NoOp {
    async fn perform(&self, input: &RunInput, _ctx: &ExecutionContext) -> RunOutput {
        RunOutput::complete(input.data.clone())
    }
}

/// Always waits for confirmations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoOpPend;

#[async_trait]
impl Adapter for NoOpPend {
    async fn perform(&self, input: &RunInput, _ctx: &ExecutionContext) -> RunOutput {
        RunOutput::pending_confirmations_with_data(input.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use oraclerun_core::{JsonData, RunId, RunStatus, TaskRunId};
    use serde_json::json;

    use super::*;
    use crate::tx_manager::DisconnectedTxManager;

    fn input() -> RunInput {
        RunInput::new(
            RunId::generate(),
            TaskRunId::generate(),
            JsonData::from_value(json!({"result": "x"})),
            RunStatus::Unstarted,
        )
    }

    #[tokio::test]
    async fn test_noop_adapters() {
        let ctx = ExecutionContext::new(Arc::new(DisconnectedTxManager));

        let out = NoOp.perform(&input(), &ctx).await;
        assert_eq!(out.status(), RunStatus::Completed);
        assert_eq!(out.result(), Some(&json!("x")));

        let out = NoOpPend.perform(&input(), &ctx).await;
        assert_eq!(out.status(), RunStatus::PendingConfirmations);
        assert_eq!(out.result(), Some(&json!("x")));
    }
}
