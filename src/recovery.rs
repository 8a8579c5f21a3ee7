//! Reconciliation of raw `(r, s)` pairs with the signer's known address.
//!
//! The custody service returns a non-recoverable signature, so the recovery
//! id has to be re-derived here by trial recovery. This is the most
//! safety-critical routine in the crate: on a mismatch it must fail loudly
//! rather than fall back to a fixed `v`.

use ethers_core::{
    k256::ecdsa::{RecoveryId, Signature as KSig, VerifyingKey},
    types::Address,
};
use thiserror::Error;

use crate::utils::verifying_key_to_address;

/// An error produced while resolving the recovery id.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// Neither recovery candidate reproduces the expected address. The digest
    /// is wrong, the raw signature is corrupted or the expected address does
    /// not belong to the signing key; the three cannot be told apart from
    /// `(r, s)` alone.
    #[error("neither recovery candidate reproduces the signer address {0:?}")]
    RecoveryMismatch(Address),
}

/// Makes a trial recovery to check whether a candidate recovery id
/// reproduces the expected address
fn check_candidate(
    sig: &KSig,
    recovery_id: RecoveryId,
    digest: [u8; 32],
    expected: Address,
) -> bool {
    VerifyingKey::recover_from_prehash(digest.as_slice(), sig, recovery_id)
        .map(|key| verifying_key_to_address(&key) == expected)
        .unwrap_or(false)
}

/// Determine the recovery id of `sig` over `digest` by trial recovery
/// against the expected signer address.
///
/// `sig` is normalized to canonical low-s first; the returned signature is
/// the normalized one, so the resolved id always refers to it. Exactly one
/// candidate can match a correct `(digest, r, s, address)` quadruple.
pub fn resolve_recovery_id(
    digest: [u8; 32],
    sig: &KSig,
    expected: Address,
) -> Result<(KSig, RecoveryId), RecoveryError> {
    let sig = sig.normalize_s().unwrap_or(*sig);

    for parity in [false, true] {
        let recovery_id = RecoveryId::new(parity, false);
        if check_candidate(&sig, recovery_id, digest, expected) {
            return Ok((sig, recovery_id))
        }
    }

    Err(RecoveryError::RecoveryMismatch(expected))
}
