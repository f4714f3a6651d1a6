//! Factory for creating the appropriate StorageDriver based on configuration.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use cloudy_core::config::StorageConfig;
use cloudy_core::error::{CloudyError, Result};
use cloudy_core::types::ProviderType;
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::driver::StorageDriver;
use crate::local::LocalStorageDriver;

type DriverFactory =
    Arc<dyn Fn(StorageConfig) -> BoxFuture<'static, Result<Arc<dyn StorageDriver>>> + Send + Sync>;

/// Custom drivers keyed by provider name.
///
/// Consulted before the built-in providers, so a registration can also
/// replace one of them.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    factories: HashMap<String, DriverFactory>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `provider` (matched case-insensitively).
    pub fn register<F, Fut>(&mut self, provider: &str, factory: F) -> &mut Self
    where
        F: Fn(StorageConfig) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn StorageDriver>>> + Send + 'static,
    {
        self.factories.insert(
            provider.trim().to_lowercase(),
            Arc::new(
                move |config: StorageConfig| -> BoxFuture<'static, Result<Arc<dyn StorageDriver>>> {
                    factory(config).boxed()
                },
            ),
        );
        self
    }

    pub fn contains(&self, provider: &str) -> bool {
        self.factories.contains_key(&provider.trim().to_lowercase())
    }

    fn get(&self, provider: &str) -> Option<&DriverFactory> {
        self.factories.get(&provider.trim().to_lowercase())
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("providers", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Create a StorageDriver for `config.provider`.
///
/// Supported built-in providers:
/// - `"local"`: a directory on the local filesystem
/// - `"s3"` / `"s3compatible"`: compile with the `s3` feature
/// - `"gcs"`: application default credentials, compile with the `gcs` feature
/// - `"azure"`: account + access key, compile with the `azure` feature
///
/// Anything else must be registered in `registry`.
pub async fn create_driver(
    config: &StorageConfig,
    registry: &DriverRegistry,
) -> Result<Arc<dyn StorageDriver>> {
    if let Some(factory) = registry.get(&config.provider) {
        if config.container.trim().is_empty() {
            return Err(CloudyError::Config("'container' is missing".to_string()));
        }
        tracing::debug!(provider = %config.provider, "using registered driver");
        return factory(config.clone()).await;
    }

    let provider = config.validate()?;
    let name = config.provider.trim().to_lowercase();

    match provider {
        ProviderType::Local => Ok(Arc::new(LocalStorageDriver::new(&name))),

        #[cfg(feature = "s3")]
        ProviderType::S3 | ProviderType::S3Compatible => {
            let path_style = config
                .path_style
                .unwrap_or(provider == ProviderType::S3Compatible);
            let region = match provider {
                ProviderType::S3Compatible => Some(config.region.as_deref().unwrap_or("us-east-1")),
                _ => config.region.as_deref(),
            };
            let driver = crate::s3::S3StorageDriver::with_options(crate::s3::S3Options {
                region,
                name: &name,
                endpoint_url: config.endpoint_url.as_deref(),
                path_style,
                access_key: config.key.as_deref(),
                secret_key: config.secret.as_deref(),
            })
            .await?;
            Ok(Arc::new(driver))
        }

        #[cfg(not(feature = "s3"))]
        ProviderType::S3 | ProviderType::S3Compatible => Err(CloudyError::Config(
            "s3 feature not enabled. Recompile with --features s3".to_string(),
        )),

        #[cfg(feature = "gcs")]
        ProviderType::Gcs => {
            let driver = crate::gcs::GcsStorageDriver::new(&name, config.credentials()).await?;
            Ok(Arc::new(driver))
        }

        #[cfg(not(feature = "gcs"))]
        ProviderType::Gcs => Err(CloudyError::Config(
            "gcs feature not enabled. Recompile with --features gcs".to_string(),
        )),

        #[cfg(feature = "azure")]
        ProviderType::Azure => {
            let (Some(account), Some(access_key)) = (config.key.as_deref(), config.secret.as_deref())
            else {
                return Err(CloudyError::Config(
                    "Azure requires 'key' (account) and 'secret' (access key)".to_string(),
                ));
            };
            let driver = crate::azure::AzureStorageDriver::new(account, access_key, &name)?;
            Ok(Arc::new(driver))
        }

        #[cfg(not(feature = "azure"))]
        ProviderType::Azure => Err(CloudyError::Config(
            "azure feature not enabled. Recompile with --features azure".to_string(),
        )),

        ProviderType::Cloudfiles | ProviderType::Other => Err(CloudyError::Config(format!(
            "No driver registered for provider '{}'",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn builds_local_driver() {
        let tmp = TempDir::new().unwrap();
        let config = StorageConfig::local(tmp.path());
        let driver = create_driver(&config, &DriverRegistry::new()).await.unwrap();
        assert_eq!(driver.kind(), ProviderType::Local);
        assert_eq!(driver.name(), "local");
    }

    #[tokio::test]
    async fn unknown_provider_is_rejected() {
        let config = StorageConfig {
            provider: "dropbox".to_string(),
            container: "c".to_string(),
            ..StorageConfig::default()
        };
        let err = create_driver(&config, &DriverRegistry::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, CloudyError::InvalidProvider(_)));
    }

    #[tokio::test]
    async fn cloudfiles_needs_registration() {
        let config = StorageConfig {
            provider: "cloudfiles".to_string(),
            container: "c".to_string(),
            ..StorageConfig::default()
        };
        let err = create_driver(&config, &DriverRegistry::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, CloudyError::Config(_)));
    }

    #[tokio::test]
    async fn registered_factory_wins() {
        let tmp = TempDir::new().unwrap();
        let mut registry = DriverRegistry::new();
        registry.register("Scratch", |_config| async {
            Ok(Arc::new(LocalStorageDriver::new("scratch")) as Arc<dyn StorageDriver>)
        });
        assert!(registry.contains("scratch"));

        let config = StorageConfig {
            provider: "scratch".to_string(),
            container: tmp.path().display().to_string(),
            ..StorageConfig::default()
        };
        let driver = create_driver(&config, &registry).await.unwrap();
        assert_eq!(driver.name(), "scratch");
    }

    #[tokio::test]
    async fn registered_provider_still_needs_container() {
        let mut registry = DriverRegistry::new();
        registry.register("scratch", |_config| async {
            Ok(Arc::new(LocalStorageDriver::new("scratch")) as Arc<dyn StorageDriver>)
        });
        let config = StorageConfig {
            provider: "scratch".to_string(),
            ..StorageConfig::default()
        };
        assert!(create_driver(&config, &registry).await.is_err());
    }
}
