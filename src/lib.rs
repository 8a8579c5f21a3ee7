//! An [ethers-rs](https://docs.rs/ethers) signer backed by keys held in
//! Google Cloud KMS.
//!
//! Cloud KMS never reveals the private key and only returns a raw,
//! non-recoverable ECDSA `(r, s)` pair over a caller-supplied digest. This
//! crate closes the gap to Ethereum's canonical 65-byte recoverable
//! signature:
//!
//! - [`split_signature`] / [`join_signature`] convert between the 65-byte
//!   form and its `(r, s, v)` components,
//! - [`resolve_recovery_id`] re-derives `v` by trial recovery against the
//!   signer's known address,
//! - [`TypedDataRequest`] dispatches digest computation across the three
//!   incompatible typed-data hashing schemes (legacy V1, and the V3/V4
//!   EIP-712 variants),
//! - [`GcpKmsSigner`] orchestrates the above and implements the ethers
//!   [`Signer`] trait, so it drops into providers and middleware like any
//!   other signer.
//!
//! The transport to Cloud KMS is abstracted behind the [`KmsProvider`]
//! trait; implement it with whatever client, authentication and retry policy
//! suits your deployment.
//!
//! ```ignore
//! use ethers_gcp_kms_signer::{GcpKmsKeyVersion, GcpKmsSigner, Signer};
//!
//! let credentials = GcpKmsKeyVersion::from_env()?;
//! let signer = GcpKmsSigner::new(kms_client, credentials, 1);
//!
//! let signature = signer.sign_message("Hello, Ethereum!").await?;
//! signature.verify("Hello, Ethereum!", signer.get_address().await?)?;
//! ```

#![deny(rustdoc::broken_intra_doc_links)]

mod codec;
mod credentials;
mod provider;
mod recovery;
mod signer;
mod typed_data;
mod utils;

pub use codec::{join_signature, split_signature, CodecError};
pub use credentials::{CredentialsError, GcpKmsKeyVersion};
pub use provider::KmsProvider;
pub use recovery::{resolve_recovery_id, RecoveryError};
pub use signer::{GcpKmsSigner, KmsSignerError};
pub use typed_data::{
    eip712_digest, hash_struct, hash_type, typed_signature_hash, validate_version, TypedDataError,
    TypedDataRequest, TypedDataV1Field, TypedDataVersion,
};

// Re-exported for downstream convenience: the ethers types this crate's API
// speaks, and the Signer trait it implements.
pub use ethers_core;
pub use ethers_signers::Signer;
