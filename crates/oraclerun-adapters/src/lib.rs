//! oraclerun task adapters.
//!
//! An adapter performs one task of a job pipeline and reports the outcome as
//! a [`RunOutput`](oraclerun_core::RunOutput). Collaborators (HTTP client,
//! transaction manager) come in through an [`ExecutionContext`].

pub mod adapter;
pub mod bridge;
pub mod error;
pub mod eth_tx;
pub mod noop;
pub mod registry;
pub mod tx_manager;

pub use adapter::{bridge_client, Adapter, ExecutionContext, DEFAULT_BRIDGE_TIMEOUT};
pub use bridge::Bridge;
pub use error::AdapterError;
pub use eth_tx::EthTx;
pub use noop::{NoOp, NoOpPend};
pub use registry::{is_builtin, AdapterKind, ETH_TX, NOOP, NOOP_PEND};
pub use tx_manager::{
    is_client_empty_error, is_client_retriable, BumpGasError, Confirmation,
    DisconnectedTxManager, Tx, TxAttempt, TxManager, TxManagerError, EMPTY_RESPONSE_CAUSE,
};
