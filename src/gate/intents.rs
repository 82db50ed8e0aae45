//! Intent correlation cache.
//!
//! Intents arrive out of band (`POST /intents`) and are keyed by the client's
//! IP address plus the current minute. A gated request looks up the slot for
//! its own client and minute, so an intent is only picked up by a submission
//! made in the same minute bucket it was stored in. Eviction happens lazily:
//! every request sweeps entries whose bucket is older than the TTL.

use dashmap::DashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use crate::gate::types::{GateError, GateResult};
use crate::observability::metrics;

/// Width of a correlation bucket in seconds.
pub const BUCKET_SECS: u64 = 60;

/// Default time an intent stays eligible, in seconds.
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Client identity plus minute bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntentKey {
    client: IpAddr,
    bucket: u64,
}

impl IntentKey {
    /// Key for `client` at unix time `now` (truncated to the minute).
    pub fn new(client: IpAddr, now: u64) -> Self {
        Self {
            client,
            bucket: now - now % BUCKET_SECS,
        }
    }

    pub fn client(&self) -> IpAddr {
        self.client
    }

    /// Unix time at the start of the bucket.
    pub fn bucket(&self) -> u64 {
        self.bucket
    }
}

impl fmt::Display for IntentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.client, self.bucket)
    }
}

/// A thread-safe intent cache.
#[derive(Clone)]
pub struct IntentCache {
    inner: Arc<DashMap<IntentKey, String>>,
    ttl_secs: u64,
}

impl Default for IntentCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECS)
    }
}

impl IntentCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl_secs,
        }
    }

    /// Store an intent. Last write wins within a bucket.
    pub fn set(&self, key: IntentKey, intent: Option<&str>) -> GateResult<()> {
        let intent = match intent {
            Some(text) if !text.trim().is_empty() => text,
            _ => return Err(GateError::Validation("Intent is required.".to_string())),
        };
        self.inner.insert(key, intent.to_string());
        metrics::record_intents(self.inner.len());
        tracing::debug!(key = %key, "Intent stored");
        Ok(())
    }

    /// Look up the intent for a key.
    pub fn get(&self, key: &IntentKey) -> Option<String> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    /// Drop every entry whose bucket is at least `ttl_secs` older than `now`.
    ///
    /// Returns how many entries were evicted.
    pub fn sweep(&self, now: u64) -> usize {
        let before = self.inner.len();
        self.inner
            .retain(|key, _| now.saturating_sub(key.bucket) < self.ttl_secs);
        let evicted = before.saturating_sub(self.inner.len());
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.inner.len(), "Swept expired intents");
            metrics::record_intents_evicted(evicted);
        }
        metrics::record_intents(self.inner.len());
        evicted
    }

    /// Copy of every cached intent, oldest bucket first.
    pub fn snapshot(&self) -> Vec<(IntentKey, String)> {
        let mut entries: Vec<_> = self
            .inner
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect();
        entries.sort_by_key(|(key, _)| key.bucket);
        entries
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }
}
