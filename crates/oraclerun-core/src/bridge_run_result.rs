//! Results reported by external bridge servers.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{JsonData, RunResult, RunStatus};

/// Message used when a bridge says `"status": "errored"` without an error.
const ERRORED_WITHOUT_MESSAGE: &str = "bridge reported errored status";

/// A result in the external adapter format.
///
/// The status is always derived while parsing, in this order:
/// errored (explicit status or any error) beats pending (flag or status),
/// which beats completed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeRunResult {
    /// Payload; usually an object but bridges may return a bare value.
    pub data: Value,

    /// Derived status.
    pub status: RunStatus,

    /// Error message reported by the bridge.
    #[serde(rename = "error")]
    pub error_message: Option<String>,

    /// Whether the bridge will call back later.
    #[serde(rename = "pending")]
    pub external_pending: bool,

    /// Token the bridge may hand back for later calls.
    pub access_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBridgeRunResult {
    #[serde(default)]
    data: Value,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    pending: Option<bool>,
    #[serde(default)]
    access_token: Option<String>,
}

impl<'de> Deserialize<'de> for BridgeRunResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawBridgeRunResult::deserialize(deserializer)?;

        let mut error_message = match raw.error {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };
        let stated = raw.status.as_deref().map(str::to_ascii_lowercase);
        let external_pending = raw.pending.unwrap_or(false);

        let status = if stated.as_deref() == Some("errored") || error_message.is_some() {
            RunStatus::Errored
        } else if external_pending || stated.as_deref() == Some("pending_bridge") {
            RunStatus::PendingBridge
        } else {
            RunStatus::Completed
        };

        if status.errored() && error_message.is_none() {
            error_message = Some(ERRORED_WITHOUT_MESSAGE.to_string());
        }

        Ok(Self {
            data: raw.data,
            status,
            error_message,
            external_pending,
            access_token: raw.access_token,
        })
    }
}

impl BridgeRunResult {
    /// Parse a bridge response body.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn has_error(&self) -> bool {
        self.status.errored() || self.error_message.is_some()
    }

    /// Convert into the persisted result form.
    pub fn into_run_result(self) -> RunResult {
        RunResult {
            data: JsonData::from_value(self.data),
            status: self.status,
            error_message: self.error_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(input: &str) -> BridgeRunResult {
        BridgeRunResult::parse(input.as_bytes()).unwrap()
    }

    #[test]
    fn test_error_beats_pending() {
        let result = parse(r#"{"error":"x","pending":true}"#);
        assert_eq!(result.status, RunStatus::Errored);
        assert_eq!(result.error_message.as_deref(), Some("x"));
    }

    #[test]
    fn test_pending_flag() {
        assert_eq!(parse(r#"{"pending":true}"#).status, RunStatus::PendingBridge);
        assert_eq!(
            parse(r#"{"status":"pending_bridge"}"#).status,
            RunStatus::PendingBridge
        );
    }

    #[test]
    fn test_completed_by_default() {
        let result = parse(r#"{"data":{"result":1}}"#);
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.data, json!({"result": 1}));
    }

    #[test]
    fn test_errored_status_without_message() {
        let result = parse(r#"{"status":"errored","pending":true}"#);
        assert_eq!(result.status, RunStatus::Errored);
        assert!(result.has_error());
    }

    #[test]
    fn test_completed_status_with_error_is_errored() {
        let result = parse(r#"{"status":"completed","error":{"code":3}}"#);
        assert_eq!(result.status, RunStatus::Errored);
        assert_eq!(result.error_message.as_deref(), Some(r#"{"code":3}"#));
    }

    #[test]
    fn test_access_token_and_conversion() {
        let result = parse(r#"{"data":{"result":"ok"},"accessToken":"abc"}"#);
        assert_eq!(result.access_token.as_deref(), Some("abc"));

        let run_result = result.into_run_result();
        assert_eq!(run_result.result_string().unwrap(), "ok");
        assert_eq!(run_result.status, RunStatus::Completed);
    }

    #[test]
    fn test_invalid_json_fails() {
        assert!(BridgeRunResult::parse(b"}").is_err());
    }
}
