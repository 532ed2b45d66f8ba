//! Results flowing through the pipeline: persisted [`RunResult`], adapter
//! [`RunInput`] and adapter [`RunOutput`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CoreError, JsonData, RunId, RunStatus, TaskRunId};

/// Persisted outcome of a task run or a job run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// Output document; `result` is the value handed to the next task.
    #[serde(default)]
    pub data: JsonData,

    /// Status reported with this result.
    #[serde(default)]
    pub status: RunStatus,

    /// Error message, present only when errored.
    #[serde(rename = "error", default)]
    pub error_message: Option<String>,
}

impl RunResult {
    /// Completed result whose `result` key is `value`.
    pub fn complete_with_result<T: Serialize + ?Sized>(value: &T) -> Self {
        let mut result = Self::default();
        result.complete_with(value);
        result
    }

    /// Errored result with the given message.
    pub fn errored(err: impl fmt::Display) -> Self {
        let mut result = Self::default();
        result.set_error(err);
        result
    }

    /// Store `value` under `result` and mark the result completed.
    pub fn complete_with<T: Serialize + ?Sized>(&mut self, value: &T) {
        self.status = RunStatus::Completed;
        self.add("result", value);
    }

    /// Serialize `value` into `data[key]`.
    ///
    /// An encoding failure does not propagate: the result becomes errored
    /// with the encoding error as its message.
    pub fn add<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        if let Err(e) = self.data.add(key, value) {
            self.set_error(e);
        }
    }

    /// Mark as errored with the given message.
    pub fn set_error(&mut self, err: impl fmt::Display) {
        self.error_message = Some(err.to_string());
        self.status = RunStatus::Errored;
    }

    /// Layer `other` over this result.
    ///
    /// Data keys from `other` win. Status and error message are always taken
    /// from `other`, even when that clears an error.
    pub fn merge(&mut self, other: &RunResult) {
        self.data.merge_from(&other.data);
        self.error_message = other.error_message.clone();
        self.status = other.status;
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// The `result` value, if any.
    pub fn result(&self) -> Option<&Value> {
        self.get("result")
    }

    /// The `result` value as a string; errors when it is not a JSON string.
    pub fn result_string(&self) -> Result<&str, CoreError> {
        result_as_str(&self.data)
    }

    pub fn has_error(&self) -> bool {
        self.error_message.is_some()
    }

    /// The error message or the empty string.
    pub fn error(&self) -> &str {
        self.error_message.as_deref().unwrap_or_default()
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RunResult(Status: \"{}\", Data: \"{}\")", self.status, self.data)
    }
}

fn result_as_str(data: &JsonData) -> Result<&str, CoreError> {
    match data.get("result") {
        Some(Value::String(s)) => Ok(s),
        _ => Err(CoreError::NonStringResult),
    }
}

/// Input handed to an adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct RunInput {
    /// Job run the task belongs to.
    pub job_run_id: RunId,

    /// Task run being performed.
    pub task_run_id: TaskRunId,

    /// Upstream data with the task run's own data layered on top.
    pub data: JsonData,

    /// Current status of the task run being performed.
    pub status: RunStatus,
}

impl RunInput {
    pub fn new(job_run_id: RunId, task_run_id: TaskRunId, data: JsonData, status: RunStatus) -> Self {
        Self {
            job_run_id,
            task_run_id,
            data,
            status,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn result(&self) -> Option<&Value> {
        self.get("result")
    }

    pub fn result_string(&self) -> Result<&str, CoreError> {
        result_as_str(&self.data)
    }
}

/// Output produced by an adapter.
///
/// Only constructible through the named constructors.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    data: JsonData,
    status: RunStatus,
    error_message: Option<String>,
}

impl RunOutput {
    fn with_status(status: RunStatus, data: JsonData) -> Self {
        Self {
            data,
            status,
            error_message: None,
        }
    }

    pub fn pending_connection() -> Self {
        Self::with_status(RunStatus::PendingConnection, JsonData::new())
    }

    pub fn pending_connection_with_data(data: JsonData) -> Self {
        Self::with_status(RunStatus::PendingConnection, data)
    }

    pub fn pending_confirmations() -> Self {
        Self::with_status(RunStatus::PendingConfirmations, JsonData::new())
    }

    pub fn pending_confirmations_with_data(data: JsonData) -> Self {
        Self::with_status(RunStatus::PendingConfirmations, data)
    }

    pub fn pending_bridge(data: JsonData) -> Self {
        Self::with_status(RunStatus::PendingBridge, data)
    }

    pub fn in_progress(data: JsonData) -> Self {
        Self::with_status(RunStatus::InProgress, data)
    }

    pub fn complete(data: JsonData) -> Self {
        Self::with_status(RunStatus::Completed, data)
    }

    /// Completed output holding only `result`; an encoding failure yields an
    /// errored output instead.
    pub fn complete_with_result<T: Serialize + ?Sized>(value: &T) -> Self {
        let mut data = JsonData::new();
        match data.add("result", value) {
            Ok(()) => Self::complete(data),
            Err(e) => Self::error(e),
        }
    }

    pub fn error(err: impl fmt::Display) -> Self {
        Self {
            data: JsonData::new(),
            status: RunStatus::Errored,
            error_message: Some(err.to_string()),
        }
    }

    /// Echo an input back with its data and status untouched.
    pub fn unchanged(input: &RunInput) -> Self {
        Self::with_status(input.status, input.data.clone())
    }

    pub fn data(&self) -> &JsonData {
        &self.data
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn has_error(&self) -> bool {
        self.error_message.is_some()
    }

    pub fn result(&self) -> Option<&Value> {
        self.data.get("result")
    }

    /// Convert into the persisted form.
    pub fn into_result(self) -> RunResult {
        RunResult {
            data: self.data,
            status: self.status,
            error_message: self.error_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> JsonData {
        JsonData::from_value(value)
    }

    #[test]
    fn test_merge_takes_other_status_and_error() {
        let mut base = RunResult {
            data: data(json!({"result": "old", "ethereumReceipts": []})),
            status: RunStatus::Errored,
            error_message: Some("boom".into()),
        };
        let other = RunResult {
            data: data(json!({"result": "new"})),
            status: RunStatus::Completed,
            error_message: None,
        };

        base.merge(&other);
        assert_eq!(base.data.to_string(), r#"{"result":"new","ethereumReceipts":[]}"#);
        assert_eq!(base.status, RunStatus::Completed);
        assert!(!base.has_error());
    }

    #[test]
    fn test_merge_with_self_is_noop() {
        let original = RunResult {
            data: data(json!({"a": 1, "result": "x"})),
            status: RunStatus::PendingBridge,
            error_message: None,
        };
        let mut merged = original.clone();
        merged.merge(&original);
        assert_eq!(merged, original);
    }

    #[test]
    fn test_add_encoding_failure_marks_errored() {
        use std::collections::BTreeMap;

        let mut bad = BTreeMap::new();
        bad.insert((1, 2), "tuple keys are not JSON");

        let mut result = RunResult::default();
        result.add("bad", &bad);
        assert_eq!(result.status, RunStatus::Errored);
        assert!(result.has_error());
    }

    #[test]
    fn test_result_string_type_mismatch() {
        let result = RunResult::complete_with_result(&42);
        assert!(matches!(result.result_string(), Err(CoreError::NonStringResult)));

        let result = RunResult::complete_with_result("0xabc");
        assert_eq!(result.result_string().unwrap(), "0xabc");
        assert_eq!(result.status, RunStatus::Completed);
    }

    #[test]
    fn test_errored_sets_status() {
        let result = RunResult::errored("nope");
        assert_eq!(result.status, RunStatus::Errored);
        assert_eq!(result.error(), "nope");
    }

    #[test]
    fn test_run_output_constructors() {
        assert_eq!(RunOutput::pending_connection().status(), RunStatus::PendingConnection);
        assert_eq!(
            RunOutput::pending_confirmations().status(),
            RunStatus::PendingConfirmations
        );
        let out = RunOutput::error("bad thing");
        assert_eq!(out.status(), RunStatus::Errored);
        assert_eq!(out.error_message(), Some("bad thing"));

        let out = RunOutput::complete_with_result("done");
        assert_eq!(out.result(), Some(&json!("done")));
        assert!(!out.has_error());
    }

    #[test]
    fn test_run_result_wire_format() {
        let result: RunResult =
            serde_json::from_str(r#"{"data":{"result":"1"},"status":"errored","error":"x"}"#)
                .unwrap();
        assert_eq!(result.status, RunStatus::Errored);
        assert_eq!(result.error(), "x");
    }
}
