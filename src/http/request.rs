//! Inbound request types.
//!
//! # Responsibilities
//! - JSON-RPC and intent request envelopes
//! - Request ID generation (UUID v4) for the `x-request-id` header

use axum::http::{HeaderName, HeaderValue, Request};
use serde::Deserialize;
use serde_json::Value;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// A JSON-RPC 2.0 call as received from the wallet.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
    /// Echoed back untouched; `null` when absent.
    #[serde(default)]
    pub id: Value,
}

/// Body of `POST /intents`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntentRequest {
    #[serde(default)]
    pub intent: Option<String>,
}

/// Assigns a fresh UUID v4 to requests that arrive without an id.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request id of an inbound request, `unknown` before the id layer ran.
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rpc_request_defaults() {
        let req: RpcRequest = serde_json::from_value(json!({"method": "eth_blockNumber"})).unwrap();
        assert!(req.params.is_empty());
        assert_eq!(req.id, Value::Null);
        assert!(req.jsonrpc.is_none());

        let req: RpcRequest = serde_json::from_value(json!({
            "jsonrpc": "2.0", "method": "eth_call", "params": [{"to": "0x00"}, "latest"], "id": "abc"
        }))
        .unwrap();
        assert_eq!(req.params.len(), 2);
        assert_eq!(req.id, json!("abc"));
    }

    #[test]
    fn test_intent_request_missing_field() {
        let req: IntentRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.intent.is_none());
    }

    #[test]
    fn test_uuid_request_id() {
        let request = Request::builder().body(()).unwrap();
        let id = UuidRequestId.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
        assert_eq!(request_id(&request), "unknown");
    }
}
