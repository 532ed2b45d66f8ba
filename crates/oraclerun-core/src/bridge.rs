//! Externally registered bridges and their tokens.
//!
//! Bridges authenticate in both directions. Outgoing requests carry the
//! outgoing token in plaintext. Callbacks present the incoming token, of which
//! we only keep a salted SHA-256 hash.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

use crate::CoreError;

/// Case-insensitive name of a task type, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskType(String);

impl TaskType {
    /// Normalize a task type name; names must be non-empty alphanumerics,
    /// `_` or `-`.
    pub fn new(name: &str) -> Result<Self, CoreError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(CoreError::InvalidInput(format!(
                "task type name '{name}' must be alphanumeric"
            )));
        }
        Ok(Self(name.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TaskType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TaskType::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Request body for registering a bridge.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeTypeRequest {
    pub name: TaskType,
    pub url: String,
    #[serde(default)]
    pub confirmations: u32,
}

/// Plaintext tokens, handed out once at registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeTypeAuthentication {
    pub name: TaskType,
    pub incoming_token: String,
    pub outgoing_token: String,
}

/// An external adapter reachable over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeType {
    /// Task type name jobs use to reference this bridge.
    pub name: TaskType,

    /// Where task requests are POSTed.
    pub url: String,

    /// Default minimum confirmations for tasks using this bridge.
    pub confirmations: u32,

    /// Hex SHA-256 of incoming token + salt.
    #[serde(skip_serializing)]
    pub incoming_token_hash: String,

    #[serde(skip_serializing)]
    pub salt: String,

    /// Sent as `Authorization: Bearer` on outgoing requests.
    #[serde(skip_serializing)]
    pub outgoing_token: String,

    pub created_at: DateTime<Utc>,
}

impl BridgeType {
    /// Build a bridge with fresh tokens.
    ///
    /// Returns the bridge to persist and the plaintext tokens for the caller.
    pub fn new(request: BridgeTypeRequest) -> (Self, BridgeTypeAuthentication) {
        let incoming_token = generate_token();
        let outgoing_token = generate_token();
        let salt = generate_token();

        let bridge = Self {
            name: request.name.clone(),
            url: request.url,
            confirmations: request.confirmations,
            incoming_token_hash: hash_token(&incoming_token, &salt),
            salt,
            outgoing_token: outgoing_token.clone(),
            created_at: Utc::now(),
        };

        let auth = BridgeTypeAuthentication {
            name: request.name,
            incoming_token,
            outgoing_token,
        };

        (bridge, auth)
    }

    /// Check a token presented by the bridge on a callback.
    pub fn authenticate(&self, incoming_token: &str) -> bool {
        hash_token(incoming_token, &self.salt) == self.incoming_token_hash
    }
}

/// 256 random bits, URL-safe base64 encoded.
pub fn generate_token() -> String {
    let mut token_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut token_bytes);
    URL_SAFE_NO_PAD.encode(token_bytes)
}

/// Hex SHA-256 of token + salt.
pub fn hash_token(token: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}
