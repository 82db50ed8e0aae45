//! The decision pipeline behind the gated JSON-RPC method.
//!
//! ```text
//! Received → Decoded → Staged → Evaluated → { Released | Rejected }
//! ```
//!
//! One [`GateContext`] is built at startup and shared by every handler. It owns
//! both in-memory maps; nothing survives a restart.

use alloy::primitives::B256;
use arc_swap::ArcSwap;
use serde_json::Value;
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;

use crate::blockchain::{
    decode_raw_transaction, BlockchainError, DecodedTransaction, DecodingError, UpstreamClient,
    UpstreamReply,
};
use crate::config::{GateConfig, RejectCleanup, SentinelConfig};
use crate::gate::evaluator::{RiskEvaluator, RiskRequest};
use crate::gate::intents::{IntentCache, IntentKey};
use crate::gate::locks::HashLocks;
use crate::gate::pending::PendingStore;
use crate::gate::release::ReleaseEngine;
use crate::gate::types::{Decision, GateResult};
use crate::observability::metrics;

/// Errors raised while building the gate at startup.
#[derive(Debug, Error)]
pub enum GateInitError {
    #[error("upstream client: {0}")]
    Upstream(#[from] BlockchainError),

    #[error("risk client: {0}")]
    RiskClient(#[from] reqwest::Error),
}

/// Long-lived state shared by every request handler.
pub struct GateContext {
    pending: PendingStore,
    intents: IntentCache,
    locks: HashLocks,
    evaluator: RiskEvaluator,
    upstream: UpstreamClient,
    release: ReleaseEngine,
    policy: ArcSwap<GateConfig>,
}

impl GateContext {
    /// Build the gate and its clients from a validated configuration.
    pub fn from_config(config: &SentinelConfig) -> Result<Self, GateInitError> {
        let upstream = UpstreamClient::new(&config.upstream)?;
        let evaluator = RiskEvaluator::new(&config.risk)?;
        let pending = PendingStore::new();

        if config.gate.on_reject == RejectCleanup::Retain {
            tracing::warn!(
                "gate.on_reject = retain: rejected transactions stay staged until resubmitted and released"
            );
        }

        Ok(Self {
            release: ReleaseEngine::new(upstream.clone(), pending.clone()),
            pending,
            intents: IntentCache::new(config.intents.ttl_secs),
            locks: HashLocks::new(),
            evaluator,
            upstream,
            policy: ArcSwap::from_pointee(config.gate.clone()),
        })
    }

    /// Current gate policy.
    pub fn policy(&self) -> Arc<GateConfig> {
        self.policy.load_full()
    }

    /// Replace the gate policy; in-flight requests keep the one they loaded.
    pub fn update_policy(&self, policy: GateConfig) {
        tracing::info!(method = %policy.method, on_reject = ?policy.on_reject, "Gate policy updated");
        self.policy.store(Arc::new(policy));
    }

    /// Whether `method` is intercepted.
    pub fn is_gated(&self, method: &str) -> bool {
        self.policy.load().method == method
    }

    pub fn pending(&self) -> &PendingStore {
        &self.pending
    }

    pub fn intents(&self) -> &IntentCache {
        &self.intents
    }

    pub fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }

    /// Evict expired intents. Called at the start of every request.
    pub fn sweep_intents(&self, now: u64) -> usize {
        self.intents.sweep(now)
    }

    /// Store an intent for `client` in the bucket for `now`.
    pub fn set_intent(&self, client: IpAddr, intent: Option<&str>, now: u64) -> GateResult<()> {
        self.intents.set(IntentKey::new(client, now), intent)
    }

    /// Forward a non-gated call verbatim.
    pub async fn forward(&self, method: &str, params: &[Value], id: &Value) -> GateResult<UpstreamReply> {
        Ok(self.upstream.forward(method, params, id).await?)
    }

    /// Run the full decision pipeline for a gated call.
    pub async fn submit(&self, params: &[Value], client: IpAddr, now: u64) -> GateResult<Decision> {
        let raw_hex = params
            .first()
            .and_then(Value::as_str)
            .ok_or(DecodingError::MissingParameter)?;
        let tx = decode_raw_transaction(raw_hex)?;

        let _lock = self.locks.acquire(tx.hash).await;
        self.pending.stage(tx.hash, tx.raw.clone(), tx.sender, now);
        // Declared after the lock so cleanup runs while the hash is still held.
        let mut staged = StagedEntry {
            gate: self,
            hash: tx.hash,
            released: false,
        };
        tracing::info!(
            tx_hash = %tx.hash,
            sender = %tx.sender,
            to = ?tx.to,
            value = %tx.value,
            "Intercepted transaction staged"
        );

        let outcome = self.evaluate_and_release(&tx, client, now).await;
        staged.released = matches!(outcome, Ok(Decision::Released(_)));
        outcome
    }

    async fn evaluate_and_release(
        &self,
        tx: &DecodedTransaction,
        client: IpAddr,
        now: u64,
    ) -> GateResult<Decision> {
        let intent = self.intents.get(&IntentKey::new(client, now)).unwrap_or_default();
        if intent.is_empty() {
            tracing::debug!(tx_hash = %tx.hash, client = %client, "No correlated intent");
        }

        let chain_id = self.upstream.chain_id().await?;
        let request = RiskRequest::from_decoded(tx, chain_id, &intent);
        let verdict = self.evaluator.evaluate(&request).await;
        metrics::record_verdict(verdict.outcome());
        self.pending.record_verdict(&tx.hash, &verdict)?;

        if !verdict.is_approved() {
            tracing::warn!(
                tx_hash = %tx.hash,
                status = %verdict.status,
                outcome = verdict.outcome(),
                message = %verdict.message,
                "Transaction rejected"
            );
            return Ok(Decision::Rejected(verdict));
        }

        tracing::info!(tx_hash = %tx.hash, "Transaction approved, releasing");
        let tx_id = self.release.release(&tx.hash).await?;
        Ok(Decision::Released(tx_id))
    }

    fn cleanup_unreleased(&self, hash: &B256) {
        match self.policy.load().on_reject {
            RejectCleanup::Remove => {
                self.pending.remove(hash);
                tracing::debug!(tx_hash = %hash, "Removed unreleased transaction");
            }
            RejectCleanup::Retain => {
                tracing::debug!(tx_hash = %hash, pending = self.pending.len(), "Retaining unreleased transaction");
            }
        }
    }
}

/// Applies the cleanup policy to a staged hash unless it was released.
///
/// Runs on every exit from [`GateContext::submit`], including when the
/// request future is dropped mid-evaluation (timeout, client disconnect).
struct StagedEntry<'a> {
    gate: &'a GateContext,
    hash: B256,
    released: bool,
}

impl Drop for StagedEntry<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.gate.cleanup_unreleased(&self.hash);
        }
    }
}

impl std::fmt::Debug for GateContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateContext")
            .field("policy", &self.policy.load())
            .field("pending", &self.pending.len())
            .field("intents", &self.intents.len())
            .field("upstream", &self.upstream)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    fn context() -> GateContext {
        let mut config = SentinelConfig::default();
        config.upstream.rpc_url = "http://127.0.0.1:1/".to_string();
        config.upstream.timeout_secs = 1;
        config.risk.api_url = "http://127.0.0.1:1/evaluate".to_string();
        GateContext::from_config(&config).unwrap()
    }

    #[test]
    fn test_policy_swap() {
        let gate = context();
        assert!(gate.is_gated("eth_sendRawTransaction"));
        assert!(!gate.is_gated("eth_call"));

        gate.update_policy(GateConfig {
            method: "eth_sendRawTransactionConditional".to_string(),
            on_reject: RejectCleanup::Remove,
        });
        assert!(!gate.is_gated("eth_sendRawTransaction"));
        assert_eq!(gate.policy().on_reject, RejectCleanup::Remove);
    }

    #[tokio::test]
    async fn test_missing_param_is_decoding_error() {
        let gate = context();
        let err = gate.submit(&[], CLIENT, 0).await.unwrap_err();
        assert!(matches!(err, crate::gate::GateError::Decoding(DecodingError::MissingParameter)));

        let err = gate.submit(&[Value::from(12)], CLIENT, 0).await.unwrap_err();
        assert!(matches!(err, crate::gate::GateError::Decoding(_)));
    }

    #[tokio::test]
    async fn test_malformed_tx_is_not_staged() {
        let gate = context();
        let err = gate
            .submit(&[Value::from("0x02c0ffee")], CLIENT, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::gate::GateError::Decoding(DecodingError::Malformed(_))));
        assert!(gate.pending().is_empty());
    }

    #[test]
    fn test_set_intent_validation() {
        let gate = context();
        assert!(gate.set_intent(CLIENT, None, 120).is_err());
        assert!(gate.intents().is_empty());
        gate.set_intent(CLIENT, Some("mint an NFT"), 120).unwrap();
        assert_eq!(gate.intents().len(), 1);
    }

    mod cancellation {
        use super::*;
        use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope};
        use alloy::eips::eip2718::Encodable2718;
        use alloy::network::TxSignerSync;
        use alloy::primitives::{address, TxKind, U256};
        use alloy::signers::local::PrivateKeySigner;
        use axum::{routing::post, Json, Router};
        use serde_json::json;
        use std::time::Duration;

        fn signed_raw() -> String {
            let signer: PrivateKeySigner =
                "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
                    .parse()
                    .unwrap();
            let mut tx = TxEip1559 {
                chain_id: 1,
                gas_limit: 21_000,
                max_fee_per_gas: 30_000_000_000,
                to: TxKind::Call(address!("70997970c51812dc3a010c7d01b50e0d17dc79c8")),
                value: U256::from(1u64),
                ..Default::default()
            };
            let sig = signer.sign_transaction_sync(&mut tx).unwrap();
            let encoded = TxEnvelope::Eip1559(tx.into_signed(sig)).encoded_2718();
            format!("0x{}", alloy::hex::encode(encoded))
        }

        async fn serve(app: Router) -> String {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{}/", addr)
        }

        /// Node that only knows `eth_chainId`; risk service that answers after 2s.
        async fn slow_gate(on_reject: RejectCleanup) -> GateContext {
            let node = serve(Router::new().route(
                "/",
                post(|Json(req): Json<Value>| async move {
                    Json(json!({"jsonrpc": "2.0", "id": req["id"], "result": "0x1"}))
                }),
            ))
            .await;
            let risk = serve(Router::new().route(
                "/evaluate",
                post(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Json(json!({}))
                }),
            ))
            .await;

            let mut config = SentinelConfig::default();
            config.upstream.rpc_url = node;
            config.risk.api_url = format!("{}evaluate", risk);
            config.risk.timeout_secs = 5;
            config.gate.on_reject = on_reject;
            GateContext::from_config(&config).unwrap()
        }

        #[tokio::test]
        async fn test_dropped_submission_follows_remove_policy() {
            let gate = slow_gate(RejectCleanup::Remove).await;
            let params = [Value::from(signed_raw())];

            let cut_short =
                tokio::time::timeout(Duration::from_millis(300), gate.submit(&params, CLIENT, 0)).await;
            assert!(cut_short.is_err());
            assert!(gate.pending().is_empty());
            assert!(gate.locks.is_empty());
        }

        #[tokio::test]
        async fn test_dropped_submission_follows_retain_policy() {
            let gate = slow_gate(RejectCleanup::Retain).await;
            let params = [Value::from(signed_raw())];

            let cut_short =
                tokio::time::timeout(Duration::from_millis(300), gate.submit(&params, CLIENT, 0)).await;
            assert!(cut_short.is_err());
            assert_eq!(gate.pending().len(), 1);
            assert!(gate.locks.is_empty());
        }
    }
}
