//! Decoding of custody service responses and signature assembly helpers.
//! These are only meant for use within this crate.

use ethers_core::{
    k256::{
        ecdsa::{RecoveryId, Signature as KSig, VerifyingKey},
        FieldBytes,
    },
    types::{Address, Signature as EthSig, U256},
    utils::keccak256,
};

use crate::signer::KmsSignerError;

/// Convert a verifying key to an ethereum address
pub(crate) fn verifying_key_to_address(key: &VerifyingKey) -> Address {
    // false for uncompressed
    let uncompressed_pub_key = key.to_encoded_point(false);
    let public_key = uncompressed_pub_key.as_bytes();
    debug_assert_eq!(public_key[0], 0x04);
    let hash = keccak256(&public_key[1..]);
    Address::from_slice(&hash[12..])
}

/// Decode a DER-encoded SubjectPublicKeyInfo document into a verifying key.
pub(crate) fn decode_pubkey(der: &[u8]) -> Result<VerifyingKey, KmsSignerError> {
    let spki = spki::SubjectPublicKeyInfoRef::try_from(der)?;
    let key = VerifyingKey::from_sec1_bytes(spki.subject_public_key.raw_bytes())?;
    Ok(key)
}

/// Decode a DER-encoded ECDSA signature, normalizing to low-s.
///
/// Cloud KMS does not commit to a canonical encoding, so the high-s form has
/// to be accepted here and flipped.
pub(crate) fn decode_signature(der: &[u8]) -> Result<KSig, KmsSignerError> {
    let sig = KSig::from_der(der)?;
    Ok(sig.normalize_s().unwrap_or(sig))
}

/// Map a recovery id to Ethereum's `v` convention: 27/28 for messages and
/// typed data, the EIP-155 chain-offset form for transactions.
pub(crate) fn v_from_recovery(recovery_id: RecoveryId, chain_id: Option<u64>) -> u64 {
    let standard_v = recovery_id.to_byte() as u64;
    match chain_id {
        Some(chain_id) => standard_v + 35 + chain_id * 2,
        None => standard_v + 27,
    }
}

/// Assemble an ethers signature from scalar components and a resolved `v`.
pub(crate) fn ethsig_from_parts(sig: &KSig, v: u64) -> EthSig {
    let r_bytes: FieldBytes = sig.r().into();
    let s_bytes: FieldBytes = sig.s().into();
    let r = U256::from_big_endian(r_bytes.as_slice());
    let s = U256::from_big_endian(s_bytes.as_slice());

    EthSig { r, s, v }
}
