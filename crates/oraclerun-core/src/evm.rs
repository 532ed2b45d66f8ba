//! EVM word encoding for transaction payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::CoreError;

/// Bytes in one EVM word.
pub const EVM_WORD_BYTE_LEN: usize = 32;

/// Named encodings a result can be transcoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    /// Dynamic `bytes`: length word followed by right-padded data.
    Bytes,
}

/// Big-endian word holding `value`.
pub fn evm_word_u64(value: u64) -> [u8; EVM_WORD_BYTE_LEN] {
    let mut word = [0u8; EVM_WORD_BYTE_LEN];
    word[EVM_WORD_BYTE_LEN - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Two's complement word holding `value`.
pub fn evm_word_i128(value: i128) -> [u8; EVM_WORD_BYTE_LEN] {
    let fill = if value < 0 { 0xff } else { 0x00 };
    let mut word = [fill; EVM_WORD_BYTE_LEN];
    word[EVM_WORD_BYTE_LEN - 16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Length word followed by `input` right-padded to a word boundary.
pub fn evm_encode_bytes(input: &[u8]) -> Vec<u8> {
    let padded_len = input.len().div_ceil(EVM_WORD_BYTE_LEN) * EVM_WORD_BYTE_LEN;
    let mut out = Vec::with_capacity(EVM_WORD_BYTE_LEN + padded_len);
    out.extend_from_slice(&evm_word_u64(input.len() as u64));
    out.extend_from_slice(input);
    out.resize(EVM_WORD_BYTE_LEN + padded_len, 0);
    out
}

/// Encode a JSON result with `format`.
pub fn evm_transcode(value: Option<&Value>, format: DataFormat) -> Result<Vec<u8>, CoreError> {
    match format {
        DataFormat::Bytes => evm_transcode_bytes(value),
    }
}

fn evm_transcode_bytes(value: Option<&Value>) -> Result<Vec<u8>, CoreError> {
    match value {
        Some(Value::String(s)) => Ok(evm_encode_bytes(s.as_bytes())),
        Some(Value::Bool(b)) => Ok(evm_encode_bytes(&evm_word_u64(u64::from(*b)))),
        Some(Value::Number(n)) => {
            let int = if let Some(i) = n.as_i64() {
                i128::from(i)
            } else if let Some(u) = n.as_u64() {
                i128::from(u)
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() => f.trunc() as i128,
                    _ => return Err(CoreError::UnsupportedValue(n.to_string())),
                }
            };
            Ok(evm_encode_bytes(&evm_word_i128(int)))
        }
        Some(other) => Err(CoreError::UnsupportedValue(other.to_string())),
        None => Err(CoreError::UnsupportedValue("missing result".to_string())),
    }
}
