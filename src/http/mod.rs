//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, handlers)
//!     → request.rs (JSON-RPC envelope, request ID)
//!     → gate::GateContext (decision pipeline or pass-through)
//!     → response.rs (JSON-RPC result/error, status mapping)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{IntentRequest, RpcRequest, UuidRequestId, X_REQUEST_ID};
pub use response::RpcFailure;
pub use server::{AppState, HttpServer};
