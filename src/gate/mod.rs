//! Transaction gate subsystem.
//!
//! # Data Flow
//! ```text
//! POST / (gated method)
//!     → engine.rs (decode via blockchain::decoder, per-hash lock)
//!     → pending.rs (stage)
//!     → intents.rs (correlated intent for client + minute)
//!     → evaluator.rs (risk service verdict, fail closed)
//!     → release.rs (broadcast on approval) | rejection
//!
//! POST /intents
//!     → intents.rs (validate, store)
//! ```
//!
//! # Design Decisions
//! - Process-local state only, rebuilt empty on start
//! - At most one evaluation per transaction hash at a time
//! - Transport failures and policy rejections both block, but stay
//!   distinguishable in the verdict source, logs and metrics

pub mod engine;
pub mod evaluator;
pub mod intents;
pub mod locks;
pub mod pending;
pub mod release;
pub mod types;

pub use engine::{GateContext, GateInitError};
pub use evaluator::{RiskEvaluator, RiskRequest};
pub use intents::{IntentCache, IntentKey};
pub use locks::HashLocks;
pub use pending::PendingStore;
pub use release::ReleaseEngine;
pub use types::{
    Decision, GateError, GateResult, PendingTransaction, SoftFailure, Verdict, VerdictSource,
};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
