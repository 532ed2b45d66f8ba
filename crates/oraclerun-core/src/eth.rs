//! Ethereum-side value types stored in run data.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{keccak256, B256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::CoreError;

/// Parse a hex string into a 32-byte hash.
///
/// Shorter input is left-padded, longer input keeps its trailing 32 bytes,
/// and an odd number of digits gets a leading zero.
pub fn hash_from_hex(input: &str) -> Result<B256, CoreError> {
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    let padded;
    let digits = if digits.len() % 2 == 1 {
        padded = format!("0{digits}");
        padded.as_str()
    } else {
        digits
    };

    let bytes = hex::decode(digits).map_err(|e| CoreError::InvalidHex {
        value: input.to_string(),
        reason: e.to_string(),
    })?;

    let mut word = [0u8; 32];
    let take = bytes.len().min(32);
    word[32 - take..].copy_from_slice(&bytes[bytes.len() - take..]);
    Ok(B256::from(word))
}

/// Full `0x`-prefixed lowercase hex of a hash.
pub fn hex_hash(hash: &B256) -> String {
    format!("0x{}", hex::encode(hash))
}

/// First four bytes of the keccak hash of a function signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionSelector([u8; 4]);

impl FunctionSelector {
    pub fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Selector for a signature such as `fulfill(uint256,bytes32)`.
    pub fn from_signature(signature: &str) -> Self {
        let hash = keccak256(signature.as_bytes());
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&hash[..4]);
        Self(bytes)
    }

    pub fn bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl FromStr for FunctionSelector {
    type Err = CoreError;

    /// Accepts `0x` + 8 hex digits or a function signature.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(digits) = s.strip_prefix("0x") {
            let decoded =
                hex::decode(digits).map_err(|_| CoreError::InvalidSelector(s.to_string()))?;
            let bytes: [u8; 4] = decoded
                .try_into()
                .map_err(|_| CoreError::InvalidSelector(s.to_string()))?;
            return Ok(Self(bytes));
        }
        if s.contains('(') && s.ends_with(')') {
            return Ok(Self::from_signature(s));
        }
        Err(CoreError::InvalidSelector(s.to_string()))
    }
}

impl fmt::Display for FunctionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for FunctionSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FunctionSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Confirmation state of a transaction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    /// Enough block confirmations.
    Safe,
    /// Seen but not yet deep enough.
    Unconfirmed,
    /// Nothing is known about the attempt.
    Unknown,
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Safe => "safe",
            Self::Unconfirmed => "unconfirmed",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Transaction receipt as recorded in `ethereumReceipts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub block_number: Option<u64>,
    pub block_hash: Option<B256>,
    #[serde(rename = "transactionHash")]
    pub hash: B256,
}

impl TxReceipt {
    /// A receipt without a block or with a zero hash is not mined yet.
    pub fn unconfirmed(&self) -> bool {
        self.hash == B256::ZERO || self.block_number.is_none()
    }
}
