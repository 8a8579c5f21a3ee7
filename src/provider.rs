//! Contract between the signer and the key custody service.

use async_trait::async_trait;

use crate::credentials::GcpKmsKeyVersion;

/// Transport to a custody service that holds the private key.
///
/// Implementors wrap whatever client reaches Cloud KMS (or a compatible
/// service); authentication, retry and timeout policy all live behind this
/// trait. The private scalar never crosses it: the service only exposes the
/// public key and raw signatures over caller-supplied digests.
///
/// Both methods speak the encodings Cloud KMS actually produces, so the
/// signer takes care of decoding:
/// - `get_public_key` returns the DER-encoded SubjectPublicKeyInfo document,
/// - `sign_digest` returns the DER-encoded ECDSA `(r, s)` pair, which is not
///   guaranteed to be in canonical low-s form.
#[async_trait]
pub trait KmsProvider: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch the public key of the given key version.
    async fn get_public_key(&self, key: &GcpKmsKeyVersion) -> Result<Vec<u8>, Self::Error>;

    /// Ask the service to sign exactly the 32-byte digest supplied.
    ///
    /// The service must not hash the input again.
    async fn sign_digest(
        &self,
        key: &GcpKmsKeyVersion,
        digest: [u8; 32],
    ) -> Result<Vec<u8>, Self::Error>;
}
