//! Staged transactions awaiting a decision.
//!
//! Entries live for the duration of one gated request. There is no reaper:
//! release removes the entry, rejection follows the configured cleanup policy.

use alloy::primitives::{Address, Bytes, B256};
use dashmap::DashMap;
use std::sync::Arc;

use crate::gate::types::{GateError, GateResult, PendingTransaction, Verdict};
use crate::observability::metrics;

/// A thread-safe store of pending transactions keyed by hash.
#[derive(Clone, Default)]
pub struct PendingStore {
    inner: Arc<DashMap<B256, PendingTransaction>>,
}

impl PendingStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a transaction, replacing any previous entry for the hash.
    pub fn stage(&self, hash: B256, raw: Bytes, sender: Address, now: u64) {
        if self
            .inner
            .insert(hash, PendingTransaction::new(hash, raw, sender, now))
            .is_some()
        {
            tracing::debug!(tx_hash = %hash, "Overwrote staged transaction");
        }
        metrics::record_pending(self.inner.len());
    }

    /// Get a copy of a staged transaction.
    pub fn get(&self, hash: &B256) -> GateResult<PendingTransaction> {
        self.inner
            .get(hash)
            .map(|r| r.value().clone())
            .ok_or(GateError::NotFound(*hash))
    }

    /// Attach an evaluation outcome to a staged transaction.
    pub fn record_verdict(&self, hash: &B256, verdict: &Verdict) -> GateResult<()> {
        let mut entry = self.inner.get_mut(hash).ok_or(GateError::NotFound(*hash))?;
        entry.approved = verdict.is_approved();
        entry.warnings = verdict.risks_detected.clone();
        entry.accepted_warning = if verdict.is_approved() {
            String::new()
        } else {
            verdict.message.clone()
        };
        Ok(())
    }

    /// Remove a staged transaction. No-op if absent.
    pub fn remove(&self, hash: &B256) -> Option<PendingTransaction> {
        let removed = self.inner.remove(hash).map(|(_, v)| v);
        metrics::record_pending(self.inner.len());
        removed
    }

    pub fn contains(&self, hash: &B256) -> bool {
        self.inner.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Copy of every staged entry, oldest first.
    pub fn snapshot(&self) -> Vec<PendingTransaction> {
        let mut entries: Vec<_> = self.inner.iter().map(|r| r.value().clone()).collect();
        entries.sort_by_key(|e| e.staged_at);
        entries
    }
}

impl std::fmt::Debug for PendingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingStore").field("len", &self.len()).finish()
    }
}
