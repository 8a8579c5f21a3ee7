//! Serialization helpers for 65-byte recoverable signatures.
//!
//! These functions only move bytes around. They never derive or validate the
//! recovery byte; that is the job of [`resolve_recovery_id`](crate::recovery).

use ethers_core::types::{Signature, U256};
use thiserror::Error;

/// An error produced while encoding or decoding a serialized signature.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Serialized secp256k1 signatures are exactly 65 bytes.
    #[error("malformed signature: expected 65 bytes, got {0}")]
    MalformedSignature(usize),
}

/// Splits a serialized signature into its components.
///
/// The first 32 bytes are `r`, the next 32 bytes are `s` and the final byte
/// is `v` in 'Electrum' notation.
pub fn split_signature(bytes: &[u8]) -> Result<Signature, CodecError> {
    if bytes.len() != 65 {
        return Err(CodecError::MalformedSignature(bytes.len()))
    }

    let r = U256::from_big_endian(&bytes[0..32]);
    let s = U256::from_big_endian(&bytes[32..64]);
    let v = bytes[64] as u64;

    Ok(Signature { r, s, v })
}

/// Concatenates `r`, `s` and `v` into the canonical 65-byte form.
///
/// The exact inverse of [`split_signature`].
pub fn join_signature(sig: &Signature) -> [u8; 65] {
    let mut out = [0u8; 65];
    sig.r.to_big_endian(&mut out[0..32]);
    sig.s.to_big_endian(&mut out[32..64]);
    out[64] = sig.v as u8;
    out
}
