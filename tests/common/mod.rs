//! Shared utilities for integration tests.
//!
//! Every helper binds `127.0.0.1:0`, so tests can run in parallel.

#![allow(dead_code)]

use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{address, keccak256, Address, Bytes, Signature, TxKind, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use sentinel_rpc::lifecycle::Shutdown;
use sentinel_rpc::{GateContext, HttpServer, SentinelConfig};

/// Anvil's first development account.
pub const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_SENDER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const RECIPIENT: Address = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");

/// A signed EIP-1559 transfer: `(0x-prefixed raw hex, transaction hash)`.
pub fn signed_transfer(nonce: u64) -> (String, B256) {
    let signer: PrivateKeySigner = TEST_PRIVATE_KEY.parse().unwrap();
    let mut tx = TxEip1559 {
        chain_id: 1,
        nonce,
        gas_limit: 21_000,
        max_fee_per_gas: 30_000_000_000,
        max_priority_fee_per_gas: 1_000_000_000,
        to: TxKind::Call(RECIPIENT),
        value: U256::from(1_000_000_000_000_000u64),
        input: Bytes::new(),
        ..Default::default()
    };
    let sig = signer.sign_transaction_sync(&mut tx).unwrap();
    let encoded = TxEnvelope::Eip1559(tx.into_signed(sig)).encoded_2718();
    (format!("0x{}", alloy::hex::encode(&encoded)), keccak256(&encoded))
}

/// A correctly encoded EIP-1559 envelope whose signature is all zeroes,
/// so no sender can be recovered from it.
pub fn unsigned_transfer() -> String {
    let tx = TxEip1559 {
        chain_id: 1,
        nonce: 0,
        gas_limit: 21_000,
        max_fee_per_gas: 30_000_000_000,
        max_priority_fee_per_gas: 1_000_000_000,
        to: TxKind::Call(RECIPIENT),
        value: U256::from(1u64),
        ..Default::default()
    };
    let zeroed = Signature::new(U256::ZERO, U256::ZERO, false);
    let encoded = TxEnvelope::Eip1559(tx.into_signed(zeroed)).encoded_2718();
    format!("0x{}", alloy::hex::encode(&encoded))
}

/// Mock upstream node. Answers `eth_chainId`, `eth_blockNumber`, the
/// broadcast method, `test_rateLimited` (HTTP 429 JSON) and
/// `test_maintenance` (HTTP 503 plain text).
pub struct MockNode {
    pub url: String,
    state: NodeState,
}

#[derive(Clone, Default)]
struct NodeState {
    broadcasts: Arc<Mutex<Vec<String>>>,
    reject_broadcasts: Arc<AtomicBool>,
}

/// Message the node returns when broadcasts are switched off.
pub const NODE_BROADCAST_ERROR: &str = "insufficient funds for gas * price + value";

impl MockNode {
    /// Raw transactions received through the broadcast method, in order.
    pub fn broadcasts(&self) -> Vec<String> {
        self.state.broadcasts.lock().unwrap().clone()
    }

    /// Answer the broadcast method with a JSON-RPC error instead of a hash.
    pub fn reject_broadcasts(&self, reject: bool) {
        self.state.reject_broadcasts.store(reject, Ordering::SeqCst);
    }
}

async fn node_handler(State(state): State<NodeState>, Json(req): Json<Value>) -> Response {
    let id = req["id"].clone();
    let ok = |result: Value| Json(json!({"jsonrpc": "2.0", "id": id, "result": result})).into_response();
    let err = |status: StatusCode, code: i64, message: &str| {
        (
            status,
            Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": code, "message": message}
            })),
        )
            .into_response()
    };

    match req["method"].as_str().unwrap_or_default() {
        "eth_chainId" => ok(json!("0x1")),
        "eth_blockNumber" => ok(json!("0x10")),
        "qn_broadcastRawTransaction" => {
            if state.reject_broadcasts.load(Ordering::SeqCst) {
                return err(StatusCode::OK, -32000, NODE_BROADCAST_ERROR);
            }
            let raw = req["params"][0].as_str().unwrap_or_default().to_string();
            let bytes = alloy::hex::decode(&raw).unwrap_or_default();
            state.broadcasts.lock().unwrap().push(raw);
            ok(json!(keccak256(&bytes)))
        }
        "test_rateLimited" => err(StatusCode::TOO_MANY_REQUESTS, -32005, "limit exceeded"),
        "test_maintenance" => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain")],
            "upstream maintenance",
        )
            .into_response(),
        _ => err(StatusCode::OK, -32601, "method not found"),
    }
}

pub async fn start_mock_node() -> MockNode {
    let state = NodeState::default();
    let app = Router::new()
        .route("/", post(node_handler))
        .with_state(state.clone());
    MockNode {
        url: serve(app).await,
        state,
    }
}

/// Programmable mock risk service.
pub struct MockRisk {
    pub url: String,
    state: RiskState,
}

impl MockRisk {
    pub fn set_reply(&self, status: StatusCode, body: Value) {
        *self.state.reply.lock().unwrap() = (status, body);
    }

    /// Hold every answer for `delay` before replying.
    pub fn set_delay(&self, delay: Duration) {
        self.state.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Bodies received so far, in order.
    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().unwrap().clone()
    }
}

#[derive(Clone)]
struct RiskState {
    reply: Arc<Mutex<(StatusCode, Value)>>,
    requests: Arc<Mutex<Vec<Value>>>,
    delay_ms: Arc<AtomicU64>,
}

async fn risk_handler(State(state): State<RiskState>, Json(req): Json<Value>) -> (StatusCode, Json<Value>) {
    state.requests.lock().unwrap().push(req);
    let delay = state.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let (status, body) = state.reply.lock().unwrap().clone();
    (status, Json(body))
}

/// A risk service answering `status`/`message` under `validations.agent`.
pub fn agent_verdict(status: &str, message: &str, risks: Value) -> Value {
    json!({"validations": {"agent": {
        "status": status,
        "message": message,
        "risks_detected": risks
    }}})
}

pub async fn start_mock_risk(status: StatusCode, body: Value) -> MockRisk {
    let state = RiskState {
        reply: Arc::new(Mutex::new((status, body))),
        requests: Arc::new(Mutex::new(Vec::new())),
        delay_ms: Arc::new(AtomicU64::new(0)),
    };
    let app = Router::new()
        .route("/evaluate", post(risk_handler))
        .with_state(state.clone());
    let base = serve(app).await;
    MockRisk {
        url: format!("{}evaluate", base),
        state,
    }
}

/// Serve `app` on an ephemeral port and return its base URL (with trailing `/`).
async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/", addr)
}

/// Configuration pointing at the given mocks.
pub fn config_for(node: &MockNode, risk: &MockRisk) -> SentinelConfig {
    let mut config = SentinelConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.rpc_url = node.url.clone();
    config.upstream.timeout_secs = 5;
    config.risk.api_url = risk.url.clone();
    config.risk.timeout_secs = 5;
    config
}

/// A running proxy. Shuts down when dropped.
pub struct Proxy {
    pub url: String,
    pub gate: Arc<GateContext>,
    pub config_tx: mpsc::UnboundedSender<SentinelConfig>,
    shutdown: Shutdown,
}

impl Drop for Proxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_proxy(config: SentinelConfig) -> Proxy {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (config_tx, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let gate = server.gate();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    Proxy {
        url: format!("http://{}", addr),
        gate,
        config_tx,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Send a JSON-RPC call to the proxy and return status and body.
pub async fn rpc(proxy: &Proxy, method: &str, params: Value) -> (StatusCode, Value) {
    let res = client()
        .post(&proxy.url)
        .json(&json!({"jsonrpc": "2.0", "method": method, "params": params, "id": 1}))
        .send()
        .await
        .expect("proxy unreachable");
    let status = StatusCode::from_u16(res.status().as_u16()).unwrap();
    (status, res.json().await.unwrap())
}

/// Post an intent and return status and body.
pub async fn post_intent(proxy: &Proxy, body: Value) -> (StatusCode, Value) {
    let res = client()
        .post(format!("{}/intents", proxy.url))
        .json(&body)
        .send()
        .await
        .expect("proxy unreachable");
    let status = StatusCode::from_u16(res.status().as_u16()).unwrap();
    (status, res.json().await.unwrap())
}
