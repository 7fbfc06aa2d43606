use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::error::{BridgeError, BridgeResult};

/// JSON-RPC error object returned by the upstream node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Upstream reply: exactly one of `result` or `error` in a well-formed response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UpstreamResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<UpstreamError>,
}

impl UpstreamResponse {
    pub fn success(result: Value) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    /// Result value, or `UpstreamFailure` if the node answered with an error.
    pub fn into_result(self) -> BridgeResult<Value> {
        match self.error {
            Some(err) => Err(BridgeError::UpstreamFailure(format!(
                "{} (code {})",
                err.message, err.code
            ))),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Relay for JSON-RPC methods the bridge does not implement itself.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn forward(&self, id: Value, method: &str, params: Value)
        -> BridgeResult<UpstreamResponse>;
}

/// TRON's Ethereum-compatible JSON-RPC endpoint (`<base>/jsonrpc`).
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    http_client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpUpstream {
    pub fn new(url: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            url: url.to_string(),
            api_key,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn forward(
        &self,
        id: Value,
        method: &str,
        params: Value,
    ) -> BridgeResult<UpstreamResponse> {
        let params = if params.is_null() { json!([]) } else { params };
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!("Forwarding {} to upstream", method);

        let mut request = self.http_client.post(&self.url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.header("TRON-PRO-API-KEY", key);
        }

        let response = request.send().await.map_err(|e| {
            error!("Upstream request for {} failed: {}", method, e);
            BridgeError::UpstreamFailure(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Upstream returned HTTP {} for {}: {}", status, method, body);
            return Err(BridgeError::UpstreamFailure(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        response.json::<UpstreamResponse>().await.map_err(|e| {
            BridgeError::UpstreamFailure(format!("invalid upstream response: {}", e))
        })
    }
}
