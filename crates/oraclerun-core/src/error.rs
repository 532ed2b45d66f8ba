//! Core domain errors.

use thiserror::Error;

/// Core domain errors for oraclerun.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The `result` value of a run is not a JSON string.
    #[error("non string result")]
    NonStringResult,

    /// A value could not be encoded into a JSON document.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Hex input could not be decoded.
    #[error("Invalid hex '{value}': {reason}")]
    InvalidHex { value: String, reason: String },

    /// Function selector was neither 4 hex bytes nor a function signature.
    #[error("Invalid function selector: {0}")]
    InvalidSelector(String),

    /// Value cannot be encoded with the requested data format.
    #[error("unsupported encoding for value: {0}")]
    UnsupportedValue(String),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
