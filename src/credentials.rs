//! Identification of the Cloud KMS key version used for signing.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An error produced while loading key credentials.
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("missing environment variable {0}")]
    MissingEnvVar(&'static str),
}

/// Fully qualifies a single Cloud KMS key version.
///
/// Cloud KMS addresses keys by resource name rather than by UUID, so all five
/// path components are required to request a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcpKmsKeyVersion {
    pub project_id: String,
    pub location_id: String,
    pub key_ring_id: String,
    pub key_id: String,
    pub key_version: String,
}

impl GcpKmsKeyVersion {
    pub fn new<S: Into<String>>(
        project_id: S,
        location_id: S,
        key_ring_id: S,
        key_id: S,
        key_version: S,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            location_id: location_id.into(),
            key_ring_id: key_ring_id.into(),
            key_id: key_id.into(),
            key_version: key_version.into(),
        }
    }

    /// The full `cryptoKeyVersions` resource name this credential points at.
    pub fn version_path(&self) -> String {
        format!(
            "projects/{}/locations/{}/keyRings/{}/cryptoKeys/{}/cryptoKeyVersions/{}",
            self.project_id, self.location_id, self.key_ring_id, self.key_id, self.key_version
        )
    }

    /// Reads the key coordinates from `GCP_PROJECT_ID`, `GCP_LOCATION_ID`,
    /// `GCP_KEY_RING_ID`, `GCP_KEY_ID` and `GCP_KEY_VERSION`.
    pub fn from_env() -> Result<Self, CredentialsError> {
        Ok(Self {
            project_id: env_var("GCP_PROJECT_ID")?,
            location_id: env_var("GCP_LOCATION_ID")?,
            key_ring_id: env_var("GCP_KEY_RING_ID")?,
            key_id: env_var("GCP_KEY_ID")?,
            key_version: env_var("GCP_KEY_VERSION")?,
        })
    }
}

impl fmt::Display for GcpKmsKeyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.version_path())
    }
}

fn env_var(name: &'static str) -> Result<String, CredentialsError> {
    std::env::var(name).map_err(|_| CredentialsError::MissingEnvVar(name))
}
