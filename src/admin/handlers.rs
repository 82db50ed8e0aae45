use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::Value;

use crate::gate::PendingTransaction;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub gated_method: String,
    pub on_reject: crate::config::RejectCleanup,
    pub pending: usize,
    pub intents: usize,
    pub intent_ttl_secs: u64,
    pub upstream_reachable: bool,
}

#[derive(Serialize)]
pub struct PendingSummary {
    pub hash: String,
    pub sender: String,
    pub approved: bool,
    pub warnings: Vec<Value>,
    pub accepted_warning: String,
    pub staged_at: u64,
}

impl From<PendingTransaction> for PendingSummary {
    fn from(tx: PendingTransaction) -> Self {
        Self {
            hash: tx.hash.to_string(),
            sender: tx.sender.to_checksum(None),
            approved: tx.approved,
            warnings: tx.warnings,
            accepted_warning: tx.accepted_warning,
            staged_at: tx.staged_at,
        }
    }
}

#[derive(Serialize)]
pub struct IntentSummary {
    pub client: String,
    pub bucket: u64,
    pub intent: String,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let policy = state.gate.policy();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        gated_method: policy.method.clone(),
        on_reject: policy.on_reject,
        pending: state.gate.pending().len(),
        intents: state.gate.intents().len(),
        intent_ttl_secs: state.gate.intents().ttl_secs(),
        upstream_reachable: state.gate.upstream().is_healthy().await,
    })
}

pub async fn get_pending(State(state): State<AppState>) -> Json<Vec<PendingSummary>> {
    Json(
        state
            .gate
            .pending()
            .snapshot()
            .into_iter()
            .map(PendingSummary::from)
            .collect(),
    )
}

pub async fn get_intents(State(state): State<AppState>) -> Json<Vec<IntentSummary>> {
    Json(
        state
            .gate
            .intents()
            .snapshot()
            .into_iter()
            .map(|(key, intent)| IntentSummary {
                client: key.client().to_string(),
                bucket: key.bucket(),
                intent,
            })
            .collect(),
    )
}
