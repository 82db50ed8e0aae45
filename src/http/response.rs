//! Response construction and error mapping.
//!
//! | Outcome                    | HTTP | JSON-RPC code |
//! |----------------------------|------|---------------|
//! | released                   | 200  | result        |
//! | rejected (policy or soft)  | 410  | -32003        |
//! | decoding failure           | 500  | -32000        |
//! | internal failure           | 500  | -32603        |
//! | pass-through transport     | 502  | -32603        |

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::blockchain::UpstreamReply;
use crate::gate::{GateError, Verdict};

pub const CODE_DECODING: i64 = -32000;
pub const CODE_REJECTED: i64 = -32003;
pub const CODE_INTERNAL: i64 = -32603;

const INTERNAL_MESSAGE: &str = "Error processing transaction.";
const UPSTREAM_MESSAGE: &str = "Upstream request failed.";

/// Successful JSON-RPC reply.
pub fn rpc_result(id: &Value, result: Value) -> Response {
    Json(json!({"result": result, "id": id, "jsonrpc": "2.0"})).into_response()
}

fn rpc_error(status: StatusCode, id: &Value, code: i64, message: &str, data: Option<Value>) -> Response {
    let mut error = json!({"code": code, "message": message});
    if let Some(data) = data {
        error["data"] = data;
    }
    (status, Json(json!({"jsonrpc": "2.0", "id": id, "error": error}))).into_response()
}

/// Blocked transaction, whether by policy or by a failed evaluation.
pub fn rejection(id: &Value, verdict: &Verdict) -> Response {
    rpc_error(
        StatusCode::GONE,
        id,
        CODE_REJECTED,
        &format!("transaction rejected: {}", verdict.message),
        Some(json!({
            "status": verdict.status,
            "risks_detected": verdict.risks_detected,
            "source": verdict.source,
        })),
    )
}

/// Upstream reply relayed with its own status, content type and body bytes.
pub fn passthrough(reply: UpstreamReply) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = (status, Body::from(reply.body)).into_response();
    if let Some(value) = reply
        .content_type
        .and_then(|ct| header::HeaderValue::from_str(&ct).ok())
    {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response
}

/// `{"error": ...}` body used by the intent endpoint.
pub fn plain_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}

/// A failed JSON-RPC call, rendered with the id of the request it answers.
#[derive(Debug)]
pub struct RpcFailure {
    id: Value,
    error: GateError,
    forwarded: bool,
}

impl RpcFailure {
    /// Failure inside the decision pipeline.
    pub fn gate(id: Value, error: GateError) -> Self {
        Self { id, error, forwarded: false }
    }

    /// Failure while relaying a non-gated call.
    pub fn forward(id: Value, error: GateError) -> Self {
        Self { id, error, forwarded: true }
    }
}

impl IntoResponse for RpcFailure {
    fn into_response(self) -> Response {
        if self.forwarded {
            tracing::error!(error = %self.error, "Pass-through request failed");
            return rpc_error(StatusCode::BAD_GATEWAY, &self.id, CODE_INTERNAL, UPSTREAM_MESSAGE, None);
        }

        match &self.error {
            GateError::Decoding(e) => {
                tracing::warn!(error = %e, "Rejected undecodable transaction");
                rpc_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &self.id,
                    CODE_DECODING,
                    &format!("Error decoding transaction: {}", e),
                    None,
                )
            }
            GateError::Validation(message) => plain_error(StatusCode::BAD_REQUEST, message),
            GateError::NotFound(_) | GateError::Upstream(_) => {
                tracing::error!(error = %self.error, "Error processing transaction");
                rpc_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &self.id,
                    CODE_INTERNAL,
                    INTERNAL_MESSAGE,
                    None,
                )
            }
        }
    }
}
