//! Upstream node client with timeout and error handling.
//!
//! # Responsibilities
//! - Forward arbitrary JSON-RPC calls and hand back the node's reply untouched
//! - Broadcast released transactions through the provider-specific method
//! - Query (and cache) the chain id used to normalize risk requests
//! - Provide health check for node connectivity

use alloy::primitives::{Bytes, B256};
use alloy::providers::{Provider, ProviderBuilder};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::UpstreamConfig;

/// Raw reply from the upstream node, forwarded as-is.
///
/// The body is kept as bytes; nodes and gateways in front of them do not
/// always answer with JSON (maintenance pages, plain-text rate limits).
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamReply {
    /// HTTP status returned by the node.
    pub status: u16,
    /// `Content-Type` header returned by the node, if any.
    pub content_type: Option<String>,
    /// Body bytes returned by the node.
    pub body: Vec<u8>,
}

impl UpstreamReply {
    /// Parse the body as JSON.
    pub fn json(&self) -> BlockchainResult<Value> {
        serde_json::from_slice(&self.body).map_err(|e| {
            BlockchainError::InvalidResponse(format!("HTTP {} with non-JSON body: {}", self.status, e))
        })
    }
}

/// Upstream JSON-RPC client.
#[derive(Clone)]
pub struct UpstreamClient {
    /// Typed provider, used for chain queries.
    provider: Arc<dyn Provider + Send + Sync>,
    /// Plain HTTP client for verbatim forwarding.
    http: reqwest::Client,
    endpoint: url::Url,
    broadcast_method: String,
    timeout_duration: Duration,
    chain_id: Arc<OnceCell<u64>>,
    next_id: Arc<AtomicU64>,
}

impl UpstreamClient {
    /// Create a new upstream client.
    ///
    /// No request is made here; an unreachable node only surfaces on first use.
    pub fn new(config: &UpstreamConfig) -> BlockchainResult<Self> {
        let endpoint: url::Url = config.endpoint().parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        let timeout_duration = Duration::from_secs(config.timeout_secs);

        let provider = Arc::new(ProviderBuilder::new().connect_http(endpoint.clone()))
            as Arc<dyn Provider + Send + Sync>;

        let http = reqwest::Client::builder()
            .timeout(timeout_duration)
            .build()
            .map_err(|e| BlockchainError::Rpc(format!("Failed to build HTTP client: {}", e)))?;

        tracing::info!(
            rpc_url = %config.rpc_url,
            broadcast_method = %config.broadcast_method,
            timeout_secs = config.timeout_secs,
            "Upstream client initialized"
        );

        Ok(Self {
            provider,
            http,
            endpoint,
            broadcast_method: config.broadcast_method.clone(),
            timeout_duration,
            chain_id: Arc::new(OnceCell::new()),
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Forward a JSON-RPC call and return the node's reply unmodified.
    pub async fn forward(&self, method: &str, params: &[Value], id: &Value) -> BlockchainResult<UpstreamReply> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(e))?
            .to_vec();

        Ok(UpstreamReply { status, content_type, body })
    }

    /// Broadcast a signed transaction and return the id the node reports.
    pub async fn broadcast(&self, raw: &Bytes) -> BlockchainResult<B256> {
        let id = Value::from(self.next_id.fetch_add(1, Ordering::Relaxed));
        let reply = self
            .forward(&self.broadcast_method, &[Value::String(raw.to_string())], &id)
            .await?;

        let result = parse_result(reply.json()?)?;
        let tx_id = result
            .as_str()
            .ok_or_else(|| BlockchainError::InvalidResponse(format!("expected hex string, got {}", result)))?;
        tx_id
            .parse::<B256>()
            .map_err(|e| BlockchainError::InvalidResponse(format!("bad transaction id '{}': {}", tx_id, e)))
    }

    /// Chain id reported by the node, fetched once.
    pub async fn chain_id(&self) -> BlockchainResult<u64> {
        self.chain_id
            .get_or_try_init(|| async {
                match timeout(self.timeout_duration, self.provider.get_chain_id()).await {
                    Ok(Ok(id)) => {
                        tracing::info!(chain_id = id, "Upstream chain id resolved");
                        Ok(id)
                    }
                    Ok(Err(e)) => Err(BlockchainError::Rpc(e.to_string())),
                    Err(_) => Err(BlockchainError::Timeout(self.timeout_duration.as_secs())),
                }
            })
            .await
            .copied()
    }

    /// Get the latest block number.
    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        match timeout(self.timeout_duration, self.provider.get_block_number()).await {
            Ok(Ok(n)) => Ok(n),
            Ok(Err(e)) => Err(BlockchainError::Rpc(e.to_string())),
            Err(_) => Err(BlockchainError::Timeout(self.timeout_duration.as_secs())),
        }
    }

    /// Check if the node is reachable.
    pub async fn is_healthy(&self) -> bool {
        self.get_block_number().await.is_ok()
    }

    /// reqwest errors carry the request URL, which embeds the credential.
    fn map_transport_error(&self, e: reqwest::Error) -> BlockchainError {
        if e.is_timeout() {
            BlockchainError::Timeout(self.timeout_duration.as_secs())
        } else {
            BlockchainError::Rpc(e.without_url().to_string())
        }
    }
}

/// Extract `result` from a JSON-RPC reply, turning `error` into an `Err`.
fn parse_result(mut body: Value) -> BlockchainResult<Value> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        return Err(BlockchainError::ErrorResponse {
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }
    match body.get_mut("result") {
        Some(result) if !result.is_null() => Ok(result.take()),
        _ => Err(BlockchainError::InvalidResponse("missing result".to_string())),
    }
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("host", &self.endpoint.host_str())
            .field("broadcast_method", &self.broadcast_method)
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}
