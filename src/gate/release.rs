//! Broadcast of approved transactions.

use alloy::primitives::B256;

use crate::blockchain::UpstreamClient;
use crate::gate::pending::PendingStore;
use crate::gate::types::GateResult;
use crate::observability::metrics;

/// Hands approved transactions to the upstream node and clears their state.
#[derive(Debug, Clone)]
pub struct ReleaseEngine {
    upstream: UpstreamClient,
    pending: PendingStore,
}

impl ReleaseEngine {
    pub fn new(upstream: UpstreamClient, pending: PendingStore) -> Self {
        Self { upstream, pending }
    }

    /// Broadcast the staged transaction for `hash` and return the node's id.
    ///
    /// A failed broadcast leaves the entry staged and propagates the error.
    pub async fn release(&self, hash: &B256) -> GateResult<B256> {
        let staged = self.pending.get(hash)?;

        let tx_id = match self.upstream.broadcast(&staged.raw).await {
            Ok(id) => id,
            Err(e) => {
                metrics::record_broadcast("error");
                return Err(e.into());
            }
        };
        metrics::record_broadcast("ok");

        self.pending.remove(hash);
        tracing::info!(tx_hash = %hash, tx_id = %tx_id, sender = %staged.sender, "Transaction released");
        Ok(tx_id)
    }
}
