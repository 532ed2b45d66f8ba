//! Adapter writing a task result to a contract through an ethereum
//! transaction, and following that transaction until it is safe.

use std::str::FromStr;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use oraclerun_core::evm::{evm_transcode, evm_word_u64, EVM_WORD_BYTE_LEN};
use oraclerun_core::{
    hash_from_hex, hex_hash, AttemptState, CoreError, DataFormat, FunctionSelector, JsonData,
    RunInput, RunOutput, TxReceipt,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::adapter::{Adapter, ExecutionContext};
use crate::error::AdapterError;
use crate::registry::ETH_TX;
use crate::tx_manager::{is_client_empty_error, is_client_retriable, Confirmation, TxManager};

const RECEIPTS_KEY: &str = "ethereumReceipts";
const LATEST_TX_HASH_KEY: &str = "latestOutgoingTxHash";

/// Sends the input `result` to `address` as call data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthTx {
    pub address: Address,

    pub function_selector: FunctionSelector,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_prefix: Option<Bytes>,

    #[serde(rename = "format", default, skip_serializing_if = "Option::is_none")]
    pub data_format: Option<DataFormat>,

    /// Accepts a JSON number or a decimal/hex string.
    #[serde(
        default,
        deserialize_with = "deserialize_gas_price",
        skip_serializing_if = "Option::is_none"
    )]
    pub gas_price: Option<U256>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
}

impl EthTx {
    pub fn new(address: Address, function_selector: FunctionSelector) -> Self {
        Self {
            address,
            function_selector,
            data_prefix: None,
            data_format: None,
            gas_price: None,
            gas_limit: None,
        }
    }

    /// Build from a task's params.
    pub fn from_params(params: &JsonData) -> Result<Self, AdapterError> {
        serde_json::from_value(params.clone().into_value()).map_err(|e| {
            AdapterError::InvalidParams {
                task_type: ETH_TX.to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Call data: selector, then prefix, then the encoded result.
    pub fn tx_data(&self, input: &RunInput) -> Result<Vec<u8>, CoreError> {
        let encoded = self.encode_result(input)?;
        let prefix: &[u8] = self.data_prefix.as_ref().map_or(&[], |p| p.as_ref());

        let mut data = Vec::with_capacity(4 + prefix.len() + encoded.len());
        data.extend_from_slice(self.function_selector.bytes());
        data.extend_from_slice(prefix);
        data.extend_from_slice(&encoded);
        Ok(data)
    }

    fn encode_result(&self, input: &RunInput) -> Result<Vec<u8>, CoreError> {
        let Some(format) = self.data_format else {
            let word = hash_from_hex(input.result_string()?)?;
            return Ok(word.to_vec());
        };

        let payload = evm_transcode(input.result(), format)?;
        let offset = if self.data_prefix.as_ref().is_some_and(|p| !p.is_empty()) {
            EVM_WORD_BYTE_LEN * 2
        } else {
            EVM_WORD_BYTE_LEN
        };

        let mut encoded = Vec::with_capacity(EVM_WORD_BYTE_LEN + payload.len());
        encoded.extend_from_slice(&evm_word_u64(offset as u64));
        encoded.extend_from_slice(&payload);
        Ok(encoded)
    }

    async fn create_tx_run_result(
        &self,
        data: Vec<u8>,
        input: &RunInput,
        tx_manager: &dyn TxManager,
    ) -> RunOutput {
        let tx = match tx_manager
            .create_tx_with_gas(
                Some(input.job_run_id.to_string()),
                self.address,
                data.into(),
                self.gas_price,
                self.gas_limit.unwrap_or(0),
            )
            .await
        {
            Ok(tx) => tx,
            Err(e) if is_client_retriable(&e) => {
                debug!(run_id = %input.job_run_id, error = %e, "EthTx submission deferred");
                return RunOutput::pending_connection();
            }
            Err(e) => return RunOutput::error(e),
        };

        let output = hash_output(&tx.hash);

        let Some(attempt) = tx.attempts.first() else {
            return RunOutput::pending_confirmations_with_data(output);
        };

        let confirmation = match tx_manager.check_attempt(attempt, tx.sent_at).await {
            Ok(confirmation) => confirmation,
            Err(e) if is_client_retriable(&e) => {
                return RunOutput::pending_connection_with_data(output)
            }
            Err(e) if is_client_empty_error(&e) => {
                return RunOutput::pending_confirmations_with_data(output)
            }
            Err(e) => return RunOutput::error(e),
        };

        debug!(
            tx_hash = %hex_hash(&attempt.hash),
            tx_id = attempt.tx_id,
            sent_at = tx.sent_at,
            state = %confirmation.state,
            "Tx #0 checked"
        );

        finish(confirmation, input, output)
    }
}

#[async_trait]
impl Adapter for EthTx {
    async fn perform(&self, input: &RunInput, ctx: &ExecutionContext) -> RunOutput {
        let tx_manager = ctx.tx_manager.as_ref();
        if !tx_manager.connected() {
            return RunOutput::pending_connection();
        }

        if input.status.pending_confirmations() {
            return ensure_tx_run_result(input, tx_manager).await;
        }

        let data = match self.tx_data(input) {
            Ok(data) => data,
            Err(e) => return RunOutput::error(format!("while constructing EthTx data: {e}")),
        };
        self.create_tx_run_result(data, input, tx_manager).await
    }
}

/// Follow up on a transaction sent by an earlier pass.
async fn ensure_tx_run_result(input: &RunInput, tx_manager: &dyn TxManager) -> RunOutput {
    let hash = match input.result_string().and_then(hash_from_hex) {
        Ok(hash) => hash,
        Err(e) => return RunOutput::error(e),
    };

    let confirmation = match tx_manager.bump_gas_until_safe(hash).await {
        Ok(confirmation) => confirmation,
        Err(err) => {
            if is_client_empty_error(&err.source) || is_client_retriable(&err.source) {
                return RunOutput::pending_confirmations_with_data(hash_output(&hash));
            }
            if err.confirmation.state == AttemptState::Unknown {
                return RunOutput::error(err.source);
            }
            warn!(
                run_id = %input.job_run_id,
                tx_hash = %hex_hash(&hash),
                error = %err.source,
                "Failed to get a receipt while resuming EthTx, will retry"
            );
            err.confirmation
        }
    };

    let mut output = JsonData::new();
    match &confirmation.receipt {
        Some(receipt) if !receipt.unconfirmed() => {
            let confirmed = Value::String(hex_hash(&receipt.hash));
            output.insert("result", confirmed.clone());
            output.insert(LATEST_TX_HASH_KEY, confirmed);
        }
        _ => output.insert("result", Value::String(hex_hash(&hash))),
    }

    finish(confirmation, input, output)
}

fn finish(confirmation: Confirmation, input: &RunInput, output: JsonData) -> RunOutput {
    match (confirmation.state, confirmation.receipt) {
        (AttemptState::Safe, Some(receipt)) => add_receipt_to_result(receipt, input, output),
        _ => RunOutput::pending_confirmations_with_data(output),
    }
}

/// Append `receipt` to the receipts already in the input and complete.
fn add_receipt_to_result(receipt: TxReceipt, input: &RunInput, mut data: JsonData) -> RunOutput {
    let mut receipts: Vec<TxReceipt> = match input.get(RECEIPTS_KEY) {
        None | Some(Value::Null) => Vec::new(),
        Some(existing) => serde_json::from_value(existing.clone()).unwrap_or_else(|e| {
            error!(run_id = %input.job_run_id, error = %e, "Unreadable ethereumReceipts, starting over");
            Vec::new()
        }),
    };

    let hash = hex_hash(&receipt.hash);
    receipts.push(receipt);

    if let Err(e) = data.add(RECEIPTS_KEY, &receipts) {
        return RunOutput::error(e);
    }
    data.insert("result", Value::String(hash));
    RunOutput::complete(data)
}

fn hash_output(hash: &B256) -> JsonData {
    let mut data = JsonData::new();
    data.insert("result", Value::String(hex_hash(hash)));
    data
}

fn deserialize_gas_price<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<U256>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|v| Some(U256::from(v)))
            .ok_or_else(|| serde::de::Error::custom(format!("invalid gasPrice {n}"))),
        Some(Value::String(s)) => U256::from_str(s.trim())
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid gasPrice {s}: {e}"))),
        Some(other) => Err(serde::de::Error::custom(format!("invalid gasPrice {other}"))),
    }
}
