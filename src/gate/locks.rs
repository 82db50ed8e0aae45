//! Per-hash mutual exclusion.
//!
//! Two submissions of the same transaction never evaluate concurrently: the
//! second waits until the first has reached a decision. Distinct hashes never
//! contend.

use alloy::primitives::B256;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<B256, Arc<Mutex<()>>>;

/// Registry of async mutexes keyed by transaction hash.
#[derive(Clone, Default)]
pub struct HashLocks {
    inner: Arc<LockMap>,
}

impl HashLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `hash`.
    pub async fn acquire(&self, hash: B256) -> HashGuard {
        let mutex = self.inner.entry(hash).or_default().clone();
        let guard = mutex.lock_owned().await;
        HashGuard {
            hash,
            registry: self.inner.clone(),
            _guard: guard,
        }
    }

    /// Number of hashes currently held or awaited.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Exclusive access to one hash; released on drop.
pub struct HashGuard {
    hash: B256,
    registry: Arc<LockMap>,
    _guard: OwnedMutexGuard<()>,
}

impl HashGuard {
    pub fn hash(&self) -> B256 {
        self.hash
    }
}

impl Drop for HashGuard {
    fn drop(&mut self) {
        // One reference in the map, one in our guard: nobody else is waiting.
        self.registry
            .remove_if(&self.hash, |_, mutex| Arc::strong_count(mutex) <= 2);
    }
}
