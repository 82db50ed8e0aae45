//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! eth_sendRawTransaction params[0]
//!     → decoder.rs (EIP-2718 decode, signer recovery, hash)
//!     → [gate evaluates the decoded fields]
//!     → client.rs (broadcast on release, verbatim forwarding otherwise)
//! ```
//!
//! # Constraints
//! - The upstream credential is part of the endpoint URL; never log the URL
//!   built from it
//! - All upstream calls have configurable timeouts

pub mod client;
pub mod decoder;
pub mod types;

pub use client::{UpstreamClient, UpstreamReply};
pub use decoder::{decode_raw_bytes, decode_raw_transaction};
pub use types::{BlockchainError, BlockchainResult, DecodedTransaction, DecodingError};
