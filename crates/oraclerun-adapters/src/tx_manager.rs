//! Contract of the ethereum transaction manager the EthTx adapter drives.
//!
//! The manager owns keys, nonces and gas bumping. Adapters only see
//! transactions, attempts and confirmations.

use std::io;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use oraclerun_core::{AttemptState, TxReceipt};
use thiserror::Error;

/// Message fragment the ethereum client returns when a call came back empty.
pub const EMPTY_RESPONSE_CAUSE: &str = "Error cause was EmptyResponse";

/// Errors reported by a [`TxManager`].
#[derive(Debug, Error)]
pub enum TxManagerError {
    /// The manager has no live connection to an ethereum node.
    #[error("pending connection to ethereum node")]
    PendingConnection,

    #[error("Network error: {0}")]
    Network(#[from] io::Error),

    #[error("Request timed out")]
    Timeout,

    /// Error returned by the ethereum node.
    #[error("{0}")]
    Rpc(String),
}

/// A submitted transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Tx {
    pub id: u64,
    /// Idempotency key; resubmitting with the same key returns the same tx.
    pub surrogate_id: Option<String>,
    pub to: Address,
    pub data: Bytes,
    pub gas_price: U256,
    pub gas_limit: u64,
    /// Hash of the latest attempt.
    pub hash: B256,
    /// Block height the first attempt was sent at.
    pub sent_at: u64,
    pub attempts: Vec<TxAttempt>,
}

/// One signed broadcast of a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TxAttempt {
    pub hash: B256,
    pub tx_id: u64,
    pub gas_price: U256,
    pub sent_at: u64,
}

/// Receipt lookup outcome for an attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub receipt: Option<TxReceipt>,
    pub state: AttemptState,
}

impl Confirmation {
    pub fn unknown() -> Self {
        Self {
            receipt: None,
            state: AttemptState::Unknown,
        }
    }
}

/// Failure of [`TxManager::bump_gas_until_safe`], with whatever confirmation
/// was observed before the error.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct BumpGasError {
    pub confirmation: Confirmation,
    #[source]
    pub source: TxManagerError,
}

impl BumpGasError {
    pub fn new(confirmation: Confirmation, source: TxManagerError) -> Self {
        Self {
            confirmation,
            source,
        }
    }
}

/// Ethereum transaction manager.
#[async_trait]
pub trait TxManager: Send + Sync {
    /// Whether an ethereum node is reachable.
    fn connected(&self) -> bool;

    /// Sign and broadcast a transaction.
    ///
    /// A `gas_price` of `None` or a `gas_limit` of 0 means "use the
    /// manager's default".
    async fn create_tx_with_gas(
        &self,
        surrogate_id: Option<String>,
        to: Address,
        data: Bytes,
        gas_price: Option<U256>,
        gas_limit: u64,
    ) -> Result<Tx, TxManagerError>;

    /// Look up the receipt of an attempt sent at `sent_at`.
    async fn check_attempt(
        &self,
        attempt: &TxAttempt,
        sent_at: u64,
    ) -> Result<Confirmation, TxManagerError>;

    /// Check the transaction that produced `hash`, bumping gas if it has been
    /// waiting too long.
    async fn bump_gas_until_safe(&self, hash: B256) -> Result<Confirmation, BumpGasError>;
}

/// Manager used when no ethereum node is configured: never connected, and
/// every call fails with [`TxManagerError::PendingConnection`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectedTxManager;

#[async_trait]
impl TxManager for DisconnectedTxManager {
    fn connected(&self) -> bool {
        false
    }

    async fn create_tx_with_gas(
        &self,
        _surrogate_id: Option<String>,
        _to: Address,
        _data: Bytes,
        _gas_price: Option<U256>,
        _gas_limit: u64,
    ) -> Result<Tx, TxManagerError> {
        Err(TxManagerError::PendingConnection)
    }

    async fn check_attempt(
        &self,
        _attempt: &TxAttempt,
        _sent_at: u64,
    ) -> Result<Confirmation, TxManagerError> {
        Err(TxManagerError::PendingConnection)
    }

    async fn bump_gas_until_safe(&self, _hash: B256) -> Result<Confirmation, BumpGasError> {
        Err(BumpGasError::new(
            Confirmation::unknown(),
            TxManagerError::PendingConnection,
        ))
    }
}

/// Whether `err` is worth retrying once the connection recovers.
pub fn is_client_retriable(err: &TxManagerError) -> bool {
    match err {
        TxManagerError::PendingConnection | TxManagerError::Timeout => true,
        TxManagerError::Network(io_err) => matches!(
            io_err.kind(),
            io::ErrorKind::TimedOut
                | io::ErrorKind::WouldBlock
                | io::ErrorKind::Interrupted
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
        ),
        TxManagerError::Rpc(_) => false,
    }
}

/// Whether `err` is the client's empty-response error.
pub fn is_client_empty_error(err: &TxManagerError) -> bool {
    err.to_string().contains(EMPTY_RESPONSE_CAUSE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_classification() {
        assert!(is_client_retriable(&TxManagerError::PendingConnection));
        assert!(is_client_retriable(&TxManagerError::Timeout));
        assert!(is_client_retriable(&TxManagerError::Network(io::Error::new(
            io::ErrorKind::TimedOut,
            "read timed out"
        ))));
        assert!(!is_client_retriable(&TxManagerError::Network(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "nope"
        ))));
        assert!(!is_client_retriable(&TxManagerError::Rpc(
            "nonce too low".into()
        )));
    }

    #[test]
    fn test_empty_error_classification() {
        let err = TxManagerError::Rpc(format!("call failed: {EMPTY_RESPONSE_CAUSE}"));
        assert!(is_client_empty_error(&err));
        assert!(!is_client_retriable(&err));
        assert!(!is_client_empty_error(&TxManagerError::Timeout));
    }

    #[tokio::test]
    async fn test_disconnected_manager_refuses_everything() {
        let manager = DisconnectedTxManager;
        assert!(!manager.connected());

        let err = manager.bump_gas_until_safe(B256::ZERO).await.unwrap_err();
        assert!(matches!(err.source, TxManagerError::PendingConnection));
        assert_eq!(err.confirmation.state, AttemptState::Unknown);
    }
}
