//! The Cloud KMS-backed Ethereum signer.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use ethers_core::{
    k256::ecdsa::{Error as K256Error, Signature as KSig, VerifyingKey},
    types::{
        transaction::{eip2718::TypedTransaction, eip712::Eip712},
        Address, Bytes, Signature as EthSig, H256,
    },
    utils::hash_message,
};
use ethers_signers::Signer;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, trace};

use crate::{
    credentials::GcpKmsKeyVersion,
    provider::KmsProvider,
    recovery::{self, RecoveryError},
    typed_data::{validate_version, TypedDataError, TypedDataRequest, TypedDataVersion},
    utils,
};

/// Errors produced by the KMS signer
#[derive(Debug, thiserror::Error)]
pub enum KmsSignerError {
    /// The custody service or its transport failed.
    #[error("kms provider error: {0}")]
    Provider(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error(transparent)]
    Recovery(#[from] RecoveryError),
    #[error(transparent)]
    TypedData(#[from] TypedDataError),
    #[error(transparent)]
    K256(#[from] K256Error),
    #[error("{0}")]
    Spki(spki::Error),
    /// A required typed-data payload was absent.
    #[error("missing typed data payload")]
    MissingData,
    /// Error type from Eip712Error message
    #[error("error encoding eip712 struct: {0}")]
    Eip712Error(String),
}

impl From<spki::Error> for KmsSignerError {
    fn from(e: spki::Error) -> Self {
        Self::Spki(e)
    }
}

fn provider_err<E>(err: E) -> KmsSignerError
where
    E: std::error::Error + Send + Sync + 'static,
{
    KmsSignerError::Provider(Box::new(err))
}

/// An ethers Signer that uses keys held in Google Cloud KMS.
///
/// The custody service only ever returns a raw `(r, s)` pair over a supplied
/// digest, so every signing operation runs the same reconciliation: compute
/// the digest, request the raw signature, resolve the recovery id against the
/// signer's address by trial recovery, and assemble the canonical 65-byte
/// recoverable signature.
///
/// The signer address is derived from the remote public key on first use and
/// cached for the lifetime of the instance; resolution is a one-way,
/// idempotent transition and costs exactly one custody round trip.
///
/// ```ignore
/// let credentials = GcpKmsKeyVersion::from_env()?;
/// let signer = GcpKmsSigner::new(provider, credentials, 1);
///
/// let signature = signer.sign_message("Hello, Ethereum!").await?;
/// signature.verify("Hello, Ethereum!", signer.get_address().await?)?;
/// ```
#[derive(Clone)]
pub struct GcpKmsSigner<P> {
    provider: P,
    key: GcpKmsKeyVersion,
    chain_id: u64,
    allowed_versions: Option<Vec<TypedDataVersion>>,
    address: Arc<OnceCell<Address>>,
}

impl<P> fmt::Debug for GcpKmsSigner<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcpKmsSigner")
            .field("key", &self.key.version_path())
            .field("chain_id", &self.chain_id)
            .field("address", &self.address.get())
            .finish()
    }
}

impl<P> fmt::Display for GcpKmsSigner<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GcpKmsSigner {{ key: {}, chain_id: {} }}", self.key, self.chain_id)
    }
}

impl<P: KmsProvider> GcpKmsSigner<P> {
    /// Instantiate a new signer for the given key version.
    ///
    /// No network traffic happens here; the signer address is resolved
    /// lazily on the first `get_address` or signing call.
    pub fn new(provider: P, key: GcpKmsKeyVersion, chain_id: u64) -> Self {
        Self {
            provider,
            key,
            chain_id,
            allowed_versions: None,
            address: Arc::new(OnceCell::new()),
        }
    }

    /// Instantiate a signer with the address already resolved, for callers
    /// that need [`Signer::address`] to be meaningful immediately.
    pub async fn new_resolved(
        provider: P,
        key: GcpKmsKeyVersion,
        chain_id: u64,
    ) -> Result<Self, KmsSignerError> {
        let signer = Self::new(provider, key, chain_id);
        signer.get_address().await?;
        Ok(signer)
    }

    /// Restrict which typed-data versions this signer accepts.
    #[must_use]
    pub fn with_allowed_versions(mut self, versions: Vec<TypedDataVersion>) -> Self {
        self.allowed_versions = Some(versions);
        self
    }

    /// Returns the signer's Ethereum address, deriving it from the remote
    /// public key on first use.
    ///
    /// Subsequent calls return the cached value without network I/O. A race
    /// to resolve concurrently is harmless: both callers converge on the
    /// same value, at worst costing a redundant custody round trip.
    #[instrument(err, skip(self), fields(key = %self.key))]
    pub async fn get_address(&self) -> Result<Address, KmsSignerError> {
        let address = self
            .address
            .get_or_try_init(|| async {
                debug!("Dispatching get_public_key");
                let der =
                    self.provider.get_public_key(&self.key).await.map_err(provider_err)?;
                let pubkey = utils::decode_pubkey(&der)?;
                let address = utils::verifying_key_to_address(&pubkey);
                debug!("Resolved signer address 0x{}", hex::encode(address));
                Ok::<_, KmsSignerError>(address)
            })
            .await?;
        Ok(*address)
    }

    /// Fetch the verifying key behind this signer's key version.
    pub async fn get_pubkey(&self) -> Result<VerifyingKey, KmsSignerError> {
        let der = self.provider.get_public_key(&self.key).await.map_err(provider_err)?;
        utils::decode_pubkey(&der)
    }

    /// Request a raw signature over `digest` from the custody service.
    ///
    /// The result is decoded from DER and normalized to low-s, but carries
    /// no recovery information yet.
    #[instrument(err, skip(self, digest), fields(digest = %hex::encode(digest)))]
    pub async fn sign_digest(&self, digest: [u8; 32]) -> Result<KSig, KmsSignerError> {
        debug!("Dispatching sign");
        let der = self.provider.sign_digest(&self.key, digest).await.map_err(provider_err)?;
        trace!("raw signature: {}", hex::encode(&der));
        utils::decode_signature(&der)
    }

    /// Shared sign path: raw signature, then recovery-id resolution against
    /// the resolved signer address, then assembly with the requested `v`
    /// convention (27/28, or the EIP-155 offset when `chain_id` is given).
    async fn sign_digest_with_v(
        &self,
        digest: H256,
        chain_id: Option<u64>,
    ) -> Result<EthSig, KmsSignerError> {
        let sig = self.sign_digest(digest.into()).await?;
        let address = self.get_address().await?;
        let (sig, recovery_id) = recovery::resolve_recovery_id(digest.into(), &sig, address)?;
        Ok(utils::ethsig_from_parts(&sig, utils::v_from_recovery(recovery_id, chain_id)))
    }

    /// Sign a version-tagged typed-data payload.
    #[instrument(err, skip(self, request), fields(version = %request.version()))]
    pub async fn sign_typed_data_request(
        &self,
        request: &TypedDataRequest,
    ) -> Result<EthSig, KmsSignerError> {
        validate_version(request.version(), self.allowed_versions.as_deref())?;
        let digest = request.digest()?;
        trace!("typed data digest: {digest:?}");
        self.sign_digest_with_v(digest, None).await
    }

    /// Sign typed data supplied as JSON, in the shape `eth_signTypedData`
    /// callers produce: the field array for V1, the full typed-data object
    /// for V3 and V4.
    pub async fn sign_typed_data_json(
        &self,
        data: &serde_json::Value,
        version: TypedDataVersion,
    ) -> Result<EthSig, KmsSignerError> {
        if data.is_null() {
            return Err(KmsSignerError::MissingData)
        }
        let request = TypedDataRequest::from_json(version, data.clone())?;
        self.sign_typed_data_request(&request).await
    }

    /// Sign a transaction and return the fully signed, transmittable RLP
    /// encoding.
    #[instrument(err, skip(self, tx))]
    pub async fn sign_transaction_encoded(
        &self,
        tx: &TypedTransaction,
    ) -> Result<Bytes, KmsSignerError> {
        let mut tx_with_chain = tx.clone();
        let chain_id =
            tx_with_chain.chain_id().map(|id| id.as_u64()).unwrap_or(self.chain_id);
        tx_with_chain.set_chain_id(chain_id);

        let signature = self.sign_digest_with_v(tx_with_chain.sighash(), Some(chain_id)).await?;
        Ok(tx_with_chain.rlp_signed(&signature))
    }
}

#[async_trait]
impl<P: KmsProvider> Signer for GcpKmsSigner<P> {
    type Error = KmsSignerError;

    #[instrument(err, skip(self, message))]
    async fn sign_message<S: Send + Sync + AsRef<[u8]>>(
        &self,
        message: S,
    ) -> Result<EthSig, Self::Error> {
        let message_hash = hash_message(message.as_ref());
        trace!("{message_hash:?}");

        self.sign_digest_with_v(message_hash, None).await
    }

    #[instrument(err, skip(self, tx))]
    async fn sign_transaction(&self, tx: &TypedTransaction) -> Result<EthSig, Self::Error> {
        let mut tx_with_chain = tx.clone();
        let chain_id =
            tx_with_chain.chain_id().map(|id| id.as_u64()).unwrap_or(self.chain_id);
        tx_with_chain.set_chain_id(chain_id);

        self.sign_digest_with_v(tx_with_chain.sighash(), Some(chain_id)).await
    }

    async fn sign_typed_data<T: Eip712 + Send + Sync>(
        &self,
        payload: &T,
    ) -> Result<EthSig, Self::Error> {
        let digest =
            payload.encode_eip712().map_err(|e| Self::Error::Eip712Error(e.to_string()))?;

        self.sign_digest_with_v(digest.into(), None).await
    }

    /// Returns the cached signer address, or the zero address while it is
    /// still unresolved. Use [`GcpKmsSigner::get_address`] (or construct via
    /// [`GcpKmsSigner::new_resolved`]) to force resolution.
    fn address(&self) -> Address {
        self.address.get().copied().unwrap_or_default()
    }

    /// Returns the signer's chain id
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Sets the signer's chain id
    fn with_chain_id<T: Into<u64>>(mut self, chain_id: T) -> Self {
        self.chain_id = chain_id.into();
        self
    }
}
