// rzpchat-core/src/mcp.rs

//! JSON-RPC 2.0 client for the Razorpay MCP endpoint.
//!
//! Each call is a single HTTP POST. The endpoint may answer with a plain JSON
//! body, newline-delimited JSON, or server-sent-event framing; in every case the
//! first line holding a JSON object with a `jsonrpc` key is taken as the reply.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace, warn};

use crate::config::{AssistConfig, CredentialSource};
use crate::errors::{snippet, DispatchError};

pub const JSONRPC_VERSION: &str = "2.0";
const ACCEPT_HEADER: &str = "application/json, text/event-stream";

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// The `result` payload, or the remote `error` as [`DispatchError::Remote`].
    pub fn into_result(self) -> Result<Value, DispatchError> {
        match self.error {
            Some(err) => Err(DispatchError::Remote {
                code: Some(err.code),
                message: err.message,
            }),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Anything that can list and invoke remote tools.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    async fn list_tools(&self) -> Result<JsonRpcResponse, DispatchError>;
    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<JsonRpcResponse, DispatchError>;
}

/// Extracts the JSON-RPC reply from a response body.
pub fn parse_rpc_body(body: &str) -> Result<JsonRpcResponse, DispatchError> {
    for line in body.lines() {
        let line = line.trim();
        let payload = line.strip_prefix("data:").map(str::trim).unwrap_or(line);
        if !payload.starts_with('{') {
            continue;
        }
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(payload) {
            if map.contains_key("jsonrpc") {
                trace!("Found JSON-RPC object in framed response.");
                return serde_json::from_value(Value::Object(map))
                    .map_err(|e| DispatchError::parse(e, body));
            }
        }
    }
    serde_json::from_str(body.trim()).map_err(|e| DispatchError::parse(e, body))
}

pub struct McpClient {
    http: Client,
    endpoint: String,
    credentials: Arc<dyn CredentialSource>,
    timeout: Duration,
    next_id: AtomicU64,
}

impl McpClient {
    pub fn new(
        endpoint: impl Into<String>,
        credentials: Arc<dyn CredentialSource>,
        timeout: Duration,
    ) -> Result<Self, DispatchError> {
        let endpoint = endpoint.into();
        let http = Client::builder()
            .build()
            .map_err(|source| DispatchError::Connection {
                endpoint: endpoint.clone(),
                source,
            })?;
        Ok(Self {
            http,
            endpoint,
            credentials,
            timeout,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn from_config(config: &AssistConfig) -> Result<Self, DispatchError> {
        Self::new(
            config.mcp.endpoint.clone(),
            Arc::new(config.credentials.clone()),
            config.mcp.timeout(),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn next_request(&self, method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: method.to_string(),
            params,
        }
    }

    /// Sends one JSON-RPC request. Credentials are resolved per call and never cached.
    pub async fn send(&self, method: &str, params: Value) -> Result<JsonRpcResponse, DispatchError> {
        let credentials = self.credentials.credentials()?;
        let request = self.next_request(method, params);
        debug!(method = %request.method, id = request.id, endpoint = %self.endpoint, "Sending JSON-RPC request.");

        let exchange = async {
            let response = self
                .http
                .post(&self.endpoint)
                .header(CONTENT_TYPE, "application/json")
                .header(ACCEPT, ACCEPT_HEADER)
                .header(AUTHORIZATION, credentials.authorization_header())
                .json(&request)
                .send()
                .await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = match tokio::time::timeout(self.timeout, exchange).await {
            Err(_) => {
                warn!(endpoint = %self.endpoint, seconds = self.timeout.as_secs(), "JSON-RPC request timed out.");
                return Err(DispatchError::Timeout {
                    endpoint: self.endpoint.clone(),
                    seconds: self.timeout.as_secs(),
                });
            }
            Ok(Err(source)) => {
                error!(endpoint = %self.endpoint, error = %source, "JSON-RPC request failed.");
                return Err(DispatchError::Connection {
                    endpoint: self.endpoint.clone(),
                    source,
                });
            }
            Ok(Ok(pair)) => pair,
        };
        trace!(status = %status, body = %body, "Received JSON-RPC response.");

        match parse_rpc_body(&body) {
            Ok(response) => Ok(response),
            Err(_) if !status.is_success() => Err(DispatchError::Http {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                snippet: snippet(&body),
            }),
            Err(e) => {
                error!(error = %e, "Could not parse JSON-RPC response.");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl ToolTransport for McpClient {
    async fn list_tools(&self) -> Result<JsonRpcResponse, DispatchError> {
        self.send("tools/list", json!({})).await
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<JsonRpcResponse, DispatchError> {
        self.send("tools/call", json!({ "name": name, "arguments": arguments }))
            .await
    }
}
