//! Adapter forwarding a task to an external bridge over HTTP.
//!
//! A bridge either answers synchronously or replies `pending` and calls back
//! later on `PATCH /v2/runs/{id}`.

use async_trait::async_trait;
use oraclerun_core::{BridgeRunResult, BridgeType, JsonData, RunId, RunInput, RunOutput, RunStatus};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::adapter::{Adapter, ExecutionContext};

/// A registered bridge bound to a task's static params.
#[derive(Debug, Clone, PartialEq)]
pub struct Bridge {
    pub bridge_type: BridgeType,
    pub params: JsonData,
}

impl Bridge {
    pub fn new(bridge_type: BridgeType, params: JsonData) -> Self {
        Self {
            bridge_type,
            params,
        }
    }

    fn request_body(&self, input: &RunInput, ctx: &ExecutionContext) -> Value {
        let mut body = Map::new();
        body.insert(
            "id".to_string(),
            Value::String(input.job_run_id.to_string()),
        );
        body.insert(
            "data".to_string(),
            self.params.merge(&input.data).into_value(),
        );
        if let Some(url) = response_url(ctx.bridge_response_url.as_deref(), &input.job_run_id) {
            body.insert("responseURL".to_string(), Value::String(url));
        }
        Value::Object(body)
    }

    async fn handle_new_run(&self, input: &RunInput, ctx: &ExecutionContext) -> RunOutput {
        let name = &self.bridge_type.name;
        debug!(
            run_id = %input.job_run_id,
            bridge = %name,
            url = %self.bridge_type.url,
            "Posting to bridge"
        );

        let response = match ctx
            .http
            .post(&self.bridge_type.url)
            .bearer_auth(&self.bridge_type.outgoing_token)
            .json(&self.request_body(input, ctx))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(bridge = %name, error = %e, "Bridge request failed");
                return RunOutput::error(format!("POST request to bridge {name} failed: {e}"));
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                return RunOutput::error(format!("reading response from bridge {name}: {e}"))
            }
        };

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            warn!(bridge = %name, status = %status, "Bridge returned non-success status");
            if text.trim().is_empty() {
                return RunOutput::error(format!("bridge {name} responded with {status}"));
            }
            return RunOutput::error(text);
        }

        response_to_output(&body, input)
    }
}

#[async_trait]
impl Adapter for Bridge {
    async fn perform(&self, input: &RunInput, ctx: &ExecutionContext) -> RunOutput {
        match input.status {
            RunStatus::Errored | RunStatus::Completed => RunOutput::unchanged(input),
            RunStatus::PendingBridge => RunOutput::in_progress(input.data.clone()),
            RunStatus::InProgress => RunOutput::pending_bridge(JsonData::new()),
            _ => self.handle_new_run(input, ctx).await,
        }
    }
}

/// Callback URL handed to the bridge, if a base URL is configured.
pub fn response_url(base: Option<&str>, run_id: &RunId) -> Option<String> {
    let base = base.map(str::trim).filter(|b| !b.is_empty())?;
    Some(format!("{}/v2/runs/{}", base.trim_end_matches('/'), run_id))
}

/// Classify a successful bridge response body.
fn response_to_output(body: &[u8], input: &RunInput) -> RunOutput {
    let result = match BridgeRunResult::parse(body) {
        Ok(result) => result,
        Err(e) => return RunOutput::error(format!("unparseable bridge response: {e}")),
    };

    if result.has_error() {
        return RunOutput::error(result.error_message.unwrap_or_default());
    }
    if result.status.pending_bridge() {
        return RunOutput::pending_bridge(JsonData::from_value(result.data));
    }

    match result.data {
        Value::Object(map) => RunOutput::complete(input.data.merge(&JsonData::from(map))),
        Value::Null => RunOutput::complete(input.data.clone()),
        Value::String(s) => RunOutput::complete_with_result(&s),
        other => RunOutput::complete_with_result(&other.to_string()),
    }
}
