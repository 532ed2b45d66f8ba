//! Resolution of task specs to adapters.

use async_trait::async_trait;
use oraclerun_core::{BridgeType, RunInput, RunOutput, TaskSpec, TaskType};

use crate::adapter::{Adapter, ExecutionContext};
use crate::bridge::Bridge;
use crate::error::AdapterError;
use crate::eth_tx::EthTx;
use crate::noop::{NoOp, NoOpPend};

pub const NOOP: &str = "noop";
pub const NOOP_PEND: &str = "nooppend";
pub const ETH_TX: &str = "ethtx";

/// Returns true for task types served without a registered bridge.
pub fn is_builtin(task_type: &TaskType) -> bool {
    matches!(task_type.as_str(), NOOP | NOOP_PEND | ETH_TX)
}

/// Every adapter the node knows how to run.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterKind {
    NoOp(NoOp),
    NoOpPend(NoOpPend),
    EthTx(Box<EthTx>),
    Bridge(Box<Bridge>),
}

impl AdapterKind {
    /// Resolve the adapter for `spec`.
    ///
    /// `bridge` is the registered bridge whose name matches the task type,
    /// if any. Builtin types take precedence over bridges.
    pub fn for_task(spec: &TaskSpec, bridge: Option<&BridgeType>) -> Result<Self, AdapterError> {
        match spec.task_type.as_str() {
            NOOP => Ok(Self::NoOp(NoOp)),
            NOOP_PEND => Ok(Self::NoOpPend(NoOpPend)),
            ETH_TX => EthTx::from_params(&spec.params).map(|a| Self::EthTx(Box::new(a))),
            _ => match bridge {
                Some(bridge) if bridge.name == spec.task_type => Ok(Self::Bridge(Box::new(
                    Bridge::new(bridge.clone(), spec.params.clone()),
                ))),
                _ => Err(AdapterError::UnknownTaskType(spec.task_type.clone())),
            },
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &str {
        match self {
            Self::NoOp(_) => NOOP,
            Self::NoOpPend(_) => NOOP_PEND,
            Self::EthTx(_) => ETH_TX,
            Self::Bridge(bridge) => bridge.bridge_type.name.as_str(),
        }
    }
}

#[async_trait]
impl Adapter for AdapterKind {
    async fn perform(&self, input: &RunInput, ctx: &ExecutionContext) -> RunOutput {
        match self {
            Self::NoOp(adapter) => adapter.perform(input, ctx).await,
            Self::NoOpPend(adapter) => adapter.perform(input, ctx).await,
            Self::EthTx(adapter) => adapter.perform(input, ctx).await,
            Self::Bridge(adapter) => adapter.perform(input, ctx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oraclerun_core::{BridgeTypeRequest, JsonData};
    use serde_json::json;

    fn spec(name: &str) -> TaskSpec {
        TaskSpec::new(TaskType::new(name).unwrap())
    }

    #[test]
    fn test_builtin_resolution() {
        assert!(matches!(
            AdapterKind::for_task(&spec("NoOp"), None).unwrap(),
            AdapterKind::NoOp(_)
        ));
        assert!(matches!(
            AdapterKind::for_task(&spec("noopPend"), None).unwrap(),
            AdapterKind::NoOpPend(_)
        ));

        let eth = spec("ethtx").with_params(JsonData::from_value(json!({
            "address": "0x0000000000000000000000000000000000000001",
            "functionSelector": "0x12345678"
        })));
        assert_eq!(AdapterKind::for_task(&eth, None).unwrap().name(), ETH_TX);

        assert!(matches!(
            AdapterKind::for_task(&spec("ethtx"), None),
            Err(AdapterError::InvalidParams { .. })
        ));
    }

    #[test]
    fn test_bridge_resolution() {
        let (bridge, _) = BridgeType::new(BridgeTypeRequest {
            name: TaskType::new("randomNumber").unwrap(),
            url: "http://localhost:8080".to_string(),
            confirmations: 0,
        });

        let kind = AdapterKind::for_task(&spec("randomnumber"), Some(&bridge)).unwrap();
        assert_eq!(kind.name(), "randomnumber");

        assert!(matches!(
            AdapterKind::for_task(&spec("unknown"), Some(&bridge)),
            Err(AdapterError::UnknownTaskType(_))
        ));
        assert!(is_builtin(&TaskType::new("EthTx").unwrap()));
        assert!(!is_builtin(&TaskType::new("randomnumber").unwrap()));
    }
}
