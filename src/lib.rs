//! Transaction-gating JSON-RPC proxy.
//!
//! Sits between a wallet and an upstream node, holds every
//! `eth_sendRawTransaction` until an external risk service approves it, and
//! relays all other calls untouched.

pub mod admin;
pub mod blockchain;
pub mod config;
pub mod gate;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::SentinelConfig;
pub use gate::GateContext;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
