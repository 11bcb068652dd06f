//! HTTP transport for the remote object API (reqwest-based).
//!
//! The directory application mounts each sub-service under
//! `/itim/services/<name>`. A call is a JSON POST carrying the operation
//! name and its positional arguments; the endpoint answers with either a
//! raw result payload or a `{"fault": ...}` body.

use std::time::Duration;

use arbor_wire::{RpcFailure, RpcFault, RpcTransport};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::DirectoryConfig;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct FaultEnvelope {
    fault: RpcFault,
}

/// Production transport over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    http_client: Client,
}

impl HttpTransport {
    /// Builds a transport for the given connection settings.
    pub fn new(config: &DirectoryConfig) -> Result<Self, RpcFailure> {
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| {
                RpcFailure::connection_from(format!("failed to build HTTP client: {e}"), e)
            })?;
        Ok(Self::with_http_client(config.base_url(), http_client))
    }

    /// Builds a transport around a pre-built `reqwest::Client` (for testing).
    #[must_use]
    pub fn with_http_client(base_url: String, http_client: Client) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            http_client,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(
        &self,
        service: &str,
        operation: &str,
        args: &[Value],
    ) -> Result<Value, RpcFailure> {
        let url = format!("{}/itim/services/{service}", self.base_url);
        debug!(%url, operation, "POST");

        let response = self
            .http_client
            .post(&url)
            .json(&json!({"operation": operation, "args": args}))
            .send()
            .await
            .map_err(|e| RpcFailure::connection_from(format!("request failed: {e}"), e))?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            RpcFailure::connection_from(format!("could not read response body: {e}"), e)
        })?;

        // Faults travel in the body; the endpoint reports them regardless
        // of the HTTP status code it happens to use.
        if let Ok(envelope) = serde_json::from_value::<FaultEnvelope>(body.clone()) {
            return Err(RpcFailure::Fault(envelope.fault));
        }

        if !status.is_success() {
            return Err(RpcFailure::connection(format!(
                "unexpected HTTP status {status} from {url}"
            )));
        }

        Ok(body)
    }
}
