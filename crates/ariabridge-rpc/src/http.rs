//! HTTP command channel.

use ariabridge_core::{ClientError, ClientResult, CommandChannel, EngineConfig, RpcMethod};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::envelope::{RpcRequest, RpcResponse, secret_params};

/// Sends JSON-RPC commands to the engine over HTTP POST.
///
/// Commands are never retried: `addUri` is not idempotent, and a retried
/// submission would start a second download.
#[derive(Debug, Clone)]
pub struct JsonRpcChannel {
    client: reqwest::Client,
    url: String,
    jsonrpc_version: String,
    session_id: String,
    secret: Option<String>,
}

impl JsonRpcChannel {
    /// Create a channel for the endpoint described by `config`.
    pub fn new(config: &EngineConfig) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.jsonrpc_url.clone(),
            jsonrpc_version: config.jsonrpc_version.clone(),
            session_id: config.session_id.clone(),
            secret: config.rpc_secret.clone(),
        })
    }

    /// Endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn transport_error(err: &reqwest::Error) -> ClientError {
    match err.status() {
        Some(status) => ClientError::transport_with_status(err.to_string(), status.as_u16()),
        None => ClientError::transport(err.to_string()),
    }
}

#[async_trait]
impl CommandChannel for JsonRpcChannel {
    async fn call(&self, method: RpcMethod, params: Vec<Value>) -> ClientResult<Value> {
        let params = secret_params(self.secret.as_deref(), params);
        let request = RpcRequest {
            jsonrpc: &self.jsonrpc_version,
            id: &self.session_id,
            method: method.as_str(),
            params,
        };

        debug!(target: "ariabridge.rpc", %method, url = %self.url, "Sending command");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| transport_error(&e))?;

        // The engine answers rejected commands with HTTP 400 and an error
        // envelope, so try the body before giving up on the status.
        match RpcResponse::parse(&body) {
            Ok(envelope) => {
                let result = envelope.into_result();
                if let Err(e) = &result {
                    warn!(target: "ariabridge.rpc", %method, error = %e, "Command rejected");
                }
                result
            }
            Err(_) if !status.is_success() => Err(ClientError::transport_with_status(
                format!("{method} failed with HTTP {status}"),
                status.as_u16(),
            )),
            Err(e) => Err(e),
        }
    }
}
