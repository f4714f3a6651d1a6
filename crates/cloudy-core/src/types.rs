use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend family a driver belongs to.
///
/// URL resolution and signed-URL generation dispatch on this value, never on
/// the driver's display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Local,
    S3,
    /// S3-compatible: MinIO, RustFS, Garage, Ceph RGW, SeaweedFS, etc.
    S3Compatible,
    Gcs,
    Azure,
    /// Rackspace Cloudfiles. No built-in driver; supplied through the registry.
    Cloudfiles,
    /// Any other custom provider.
    Other,
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderType::Local => write!(f, "local"),
            ProviderType::S3 => write!(f, "s3"),
            ProviderType::S3Compatible => write!(f, "s3compatible"),
            ProviderType::Gcs => write!(f, "google_storage"),
            ProviderType::Azure => write!(f, "azure_blobs"),
            ProviderType::Cloudfiles => write!(f, "cloudfiles"),
            ProviderType::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for ProviderType {
    type Err = crate::error::CloudyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(ProviderType::Local),
            "s3" => Ok(ProviderType::S3),
            "s3compatible" | "s3-compatible" | "minio" | "rustfs" | "garage" => {
                Ok(ProviderType::S3Compatible)
            }
            "gcs" | "google" | "google_storage" => Ok(ProviderType::Gcs),
            "azure" | "azure_blobs" => Ok(ProviderType::Azure),
            "cloudfiles" => Ok(ProviderType::Cloudfiles),
            _ => Err(crate::error::CloudyError::InvalidProvider(s.to_string())),
        }
    }
}

/// Key/secret pair handed to a driver. The secret never appears in `Debug`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub key: Option<String>,
    pub secret: Option<String>,
}

impl Credentials {
    pub fn new(key: Option<&str>, secret: Option<&str>) -> Self {
        Self {
            key: key.map(str::to_string),
            secret: secret.map(str::to_string),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
