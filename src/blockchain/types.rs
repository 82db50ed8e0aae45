//! Chain-specific types and error definitions.

use alloy::primitives::{Address, Bytes, B256, U256};
use thiserror::Error;

/// Structural view of a signed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransaction {
    /// keccak-256 of the raw signed bytes.
    pub hash: B256,
    /// Address recovered from the signature.
    pub sender: Address,
    /// Recipient; `None` for contract creation.
    pub to: Option<Address>,
    /// Call data, empty when absent.
    pub input: Bytes,
    /// Value transferred in wei.
    pub value: U256,
    /// EIP-155 chain id, absent on pre-155 legacy transactions.
    pub chain_id: Option<u64>,
    /// The raw signed payload as received.
    pub raw: Bytes,
}

/// Errors produced while decoding a raw signed transaction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodingError {
    /// The gated call did not carry a raw transaction string.
    #[error("missing raw transaction parameter")]
    MissingParameter,

    #[error("raw transaction is not valid hex: {0}")]
    InvalidHex(String),

    #[error("raw transaction is empty")]
    Empty,

    /// The EIP-2718 envelope could not be decoded.
    #[error("malformed transaction encoding: {0}")]
    Malformed(String),

    #[error("{0} unexpected trailing bytes after transaction")]
    TrailingBytes(usize),

    /// The sender could not be recovered from the signature.
    #[error("unrecoverable signature: {0}")]
    Signature(String),
}

/// Errors that can occur while talking to the upstream node.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The node answered with a JSON-RPC error object.
    #[error("RPC error response {code}: {message}")]
    ErrorResponse { code: i64, message: String },

    /// The node answered with something that is not a usable JSON-RPC reply.
    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;
