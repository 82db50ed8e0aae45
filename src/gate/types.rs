//! Decision gate types and error definitions.

use alloy::primitives::{Address, Bytes, B256};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::blockchain::{BlockchainError, DecodingError};

/// Status string the risk service uses for a clean pass.
pub const APPROVED: &str = "approved";

/// A transaction held between receipt and decision.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTransaction {
    pub hash: B256,
    pub raw: Bytes,
    pub sender: Address,
    pub approved: bool,
    /// Risk findings attached by the evaluator, in service order.
    pub warnings: Vec<Value>,
    /// Message surfaced to the caller when the transaction is held back.
    pub accepted_warning: String,
    /// Unix seconds when staged.
    pub staged_at: u64,
}

impl PendingTransaction {
    pub fn new(hash: B256, raw: Bytes, sender: Address, staged_at: u64) -> Self {
        Self {
            hash,
            raw,
            sender,
            approved: false,
            warnings: Vec::new(),
            accepted_warning: String::new(),
            staged_at,
        }
    }
}

/// Why an evaluation produced no policy answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SoftFailure {
    /// The service answered with a non-success status.
    HttpStatus { status: u16 },
    /// The service could not be reached.
    Transport { detail: String },
    /// The service did not answer in time.
    Timeout { after_secs: u64 },
    /// The service answered 2xx with an unreadable body.
    MalformedBody { detail: String },
}

impl SoftFailure {
    /// Metric/log label.
    pub fn label(&self) -> &'static str {
        match self {
            SoftFailure::HttpStatus { .. } => "http_status",
            SoftFailure::Transport { .. } => "transport",
            SoftFailure::Timeout { .. } => "timeout",
            SoftFailure::MalformedBody { .. } => "malformed_body",
        }
    }
}

/// Where a verdict came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    /// The risk service evaluated the transaction.
    Policy,
    /// The evaluation itself failed; the verdict fails closed.
    SoftFailure(SoftFailure),
}

/// Normalized outcome of a risk evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub status: String,
    pub message: String,
    pub risks_detected: Vec<Value>,
    pub source: VerdictSource,
}

impl Verdict {
    /// Only an exact `"approved"` status releases a transaction.
    pub fn is_approved(&self) -> bool {
        self.status == APPROVED
    }

    pub fn is_soft_failure(&self) -> bool {
        matches!(self.source, VerdictSource::SoftFailure(_))
    }

    /// Fail-closed verdict for an evaluation that never produced an answer.
    pub fn soft_failure(failure: SoftFailure) -> Self {
        let message = match &failure {
            SoftFailure::HttpStatus { status } => {
                format!("Error evaluating transaction: HTTP {}", status)
            }
            SoftFailure::Timeout { after_secs } => {
                format!("Error evaluating transaction: timed out after {}s", after_secs)
            }
            SoftFailure::Transport { .. } | SoftFailure::MalformedBody { .. } => {
                "Error evaluating transaction: risk service unavailable".to_string()
            }
        };
        Self {
            status: "failed".to_string(),
            message,
            risks_detected: Vec::new(),
            source: VerdictSource::SoftFailure(failure),
        }
    }

    /// Metric label: `approved`, `rejected` or `soft_failure`.
    pub fn outcome(&self) -> &'static str {
        if self.is_soft_failure() {
            "soft_failure"
        } else if self.is_approved() {
            "approved"
        } else {
            "rejected"
        }
    }
}

/// Terminal state of a gated request.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Broadcast succeeded; carries the node's transaction id.
    Released(B256),
    /// Held back; carries the verdict that blocked it.
    Rejected(Verdict),
}

/// Errors that can occur while deciding on a transaction.
#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Decoding(#[from] DecodingError),

    /// Caller input failed validation.
    #[error("{0}")]
    Validation(String),

    #[error("no pending transaction for {0}")]
    NotFound(B256),

    #[error("upstream error: {0}")]
    Upstream(#[from] BlockchainError),
}

/// Result type for gate operations.
pub type GateResult<T> = Result<T, GateError>;
