//! Raw signed transaction decoding.
//!
//! Accepts any EIP-2718 envelope alloy understands (legacy, 2930, 1559,
//! 4844, 7702). The sender is recovered from the signed form before any
//! field is extracted.

use alloy::consensus::transaction::SignerRecoverable;
use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{hex, keccak256, Bytes};

use crate::blockchain::types::{DecodedTransaction, DecodingError};

/// Decode a `0x`-prefixed (or bare) hex string holding a signed transaction.
pub fn decode_raw_transaction(raw_hex: &str) -> Result<DecodedTransaction, DecodingError> {
    let raw = hex::decode(raw_hex.trim()).map_err(|e| DecodingError::InvalidHex(e.to_string()))?;
    decode_raw_bytes(Bytes::from(raw))
}

/// Decode raw signed transaction bytes.
pub fn decode_raw_bytes(raw: Bytes) -> Result<DecodedTransaction, DecodingError> {
    if raw.is_empty() {
        return Err(DecodingError::Empty);
    }

    let mut buf = raw.as_ref();
    let envelope = TxEnvelope::decode_2718(&mut buf)
        .map_err(|e| DecodingError::Malformed(e.to_string()))?;
    if !buf.is_empty() {
        return Err(DecodingError::TrailingBytes(buf.len()));
    }

    let sender = envelope
        .recover_signer()
        .map_err(|e| DecodingError::Signature(e.to_string()))?;

    Ok(DecodedTransaction {
        hash: keccak256(&raw),
        sender,
        to: envelope.to(),
        input: envelope.input().clone(),
        value: envelope.value(),
        chain_id: envelope.chain_id(),
        raw,
    })
}
