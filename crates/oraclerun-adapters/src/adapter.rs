//! The adapter contract and the collaborators adapters run with.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use oraclerun_core::{RunInput, RunOutput};
use tracing::warn;

use crate::tx_manager::TxManager;

/// Default timeout for outgoing bridge requests.
pub const DEFAULT_BRIDGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Collaborators injected into every adapter call.
#[derive(Clone)]
pub struct ExecutionContext {
    pub tx_manager: Arc<dyn TxManager>,
    pub http: reqwest::Client,
    /// Base URL bridges are told to call back on.
    pub bridge_response_url: Option<String>,
}

impl ExecutionContext {
    /// Context with a default bridge client.
    ///
    /// Falls back to reqwest's default client, which has no request timeout,
    /// if the bridge client cannot be built.
    pub fn new(tx_manager: Arc<dyn TxManager>) -> Self {
        let http = match bridge_client(DEFAULT_BRIDGE_TIMEOUT) {
            Ok(http) => http,
            Err(e) => {
                warn!(error = %e, "Failed to build bridge HTTP client, using default client without timeout");
                reqwest::Client::default()
            }
        };
        Self {
            tx_manager,
            http,
            bridge_response_url: None,
        }
    }

    /// Builder method to replace the HTTP client.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Builder method to set the bridge callback base URL.
    pub fn with_bridge_response_url(mut self, url: impl Into<String>) -> Self {
        self.bridge_response_url = Some(url.into());
        self
    }
}

/// HTTP client for bridge requests with the given request timeout.
pub fn bridge_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("connected", &self.tx_manager.connected())
            .field("bridge_response_url", &self.bridge_response_url)
            .finish()
    }
}

/// A unit of work in a job pipeline.
///
/// Implementations must not keep state between calls: the same input may be
/// performed again after a pending outcome.
#[async_trait]
pub trait Adapter: Send + Sync {
    async fn perform(&self, input: &RunInput, ctx: &ExecutionContext) -> RunOutput;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DisconnectedTxManager;

    #[test]
    fn test_bridge_client_builds() {
        assert!(bridge_client(DEFAULT_BRIDGE_TIMEOUT).is_ok());
        assert!(bridge_client(Duration::from_millis(1)).is_ok());
    }

    #[test]
    fn test_context_defaults() {
        let ctx = ExecutionContext::new(Arc::new(DisconnectedTxManager))
            .with_bridge_response_url("http://node:6688");
        assert_eq!(ctx.bridge_response_url.as_deref(), Some("http://node:6688"));
        assert!(!ctx.tx_manager.connected());
    }
}
