use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cloudy_core::config::StorageConfig;
use cloudy_core::error::{CloudyError, Result};
use cloudy_core::extensions::ExtensionCategory;
use cloudy_core::naming;
use cloudy_core::types::ProviderType;
use tokio::io::AsyncWriteExt;

use crate::driver::{Container, Metadata, ObjectDescriptor, StorageDriver};
use crate::signing;
use crate::url::{UrlOptions, UrlResolver};

/// Upper bound on the buffer reserved up front by `read_bytes`.
const READ_PREALLOC_LIMIT: u64 = 8 * 1024 * 1024;

/// One stored file, bound to the driver and container it lives in.
#[derive(Clone)]
pub struct Object {
    pub name: String,
    pub size: u64,
    pub hash: Option<String>,
    pub extra: Metadata,
    pub meta_data: Metadata,
    container: Container,
    driver: Arc<dyn StorageDriver>,
    config: Arc<StorageConfig>,
}

impl Object {
    pub(crate) fn new(
        descriptor: ObjectDescriptor,
        container: Container,
        driver: Arc<dyn StorageDriver>,
        config: Arc<StorageConfig>,
    ) -> Self {
        Self {
            name: descriptor.name,
            size: descriptor.size,
            hash: descriptor.hash,
            extra: descriptor.extra,
            meta_data: descriptor.meta_data,
            container,
            driver,
            config,
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn descriptor(&self) -> ObjectDescriptor {
        ObjectDescriptor {
            name: self.name.clone(),
            size: self.size,
            hash: self.hash.clone(),
            extra: self.extra.clone(),
            meta_data: self.meta_data.clone(),
        }
    }

    fn resolver(&self) -> UrlResolver<'_> {
        UrlResolver::new(self.driver.as_ref(), &self.container, &self.config)
    }

    /// URL honouring the configured `secure_urls` preference. Relative for
    /// local storage.
    pub fn url(&self) -> Result<String> {
        self.url_with(UrlOptions {
            secure: self.config.secure_urls,
            long_url: false,
        })
    }

    /// Like [`Object::url`], but fully qualified for local storage when a
    /// `public_url` is configured.
    pub fn full_url(&self) -> Result<String> {
        self.url_with(UrlOptions {
            secure: self.config.secure_urls,
            long_url: true,
        })
    }

    /// Fully qualified `https` URL.
    pub fn secure_url(&self) -> Result<String> {
        self.url_with(UrlOptions::secure())
    }

    pub fn url_with(&self, opts: UrlOptions) -> Result<String> {
        self.resolver().resolve(&self.descriptor(), opts)
    }

    pub fn extension(&self) -> String {
        naming::file_extension(&self.name)
    }

    pub fn category(&self) -> ExtensionCategory {
        naming::extension_category(&self.name)
    }

    pub fn provider_name(&self) -> String {
        self.driver.kind().to_string()
    }

    /// `{container}/{name}`
    pub fn path(&self) -> String {
        format!("{}/{}", self.container.name, self.name)
    }

    /// Absolute filesystem path for local storage, [`Object::path`] otherwise.
    pub fn full_path(&self) -> String {
        match (&self.container.key, self.driver.kind()) {
            (Some(root), ProviderType::Local) => Path::new(root).join(&self.name).display().to_string(),
            _ => self.path(),
        }
    }

    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Download into `destination`, which must be an existing directory.
    ///
    /// The file is named after the object, or `{name}.{extension}` when
    /// `name` is given. An existing file is only replaced with `overwrite`.
    pub async fn save_to(
        &self,
        destination: &Path,
        name: Option<&str>,
        overwrite: bool,
        delete_on_failure: bool,
    ) -> Result<PathBuf> {
        if !destination.is_dir() {
            return Err(CloudyError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("'{}' is not a valid directory", destination.display()),
            )));
        }

        let relative = match name {
            Some(n) => {
                let ext = self.extension();
                if ext.is_empty() {
                    n.to_string()
                } else {
                    format!("{n}.{ext}")
                }
            }
            None => self.name.clone(),
        };
        let target = destination.join(contained_path(&relative)?);

        if target.exists() && !overwrite {
            return Err(CloudyError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("'{}' already exists", target.display()),
            )));
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(&target).await?;
        let result = self
            .driver
            .download_object(&self.container, &self.name, &mut file)
            .await;
        let result = match result {
            Ok(n) => file.flush().await.map(|_| n).map_err(CloudyError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(bytes) => {
                tracing::debug!(object = %self.name, target = %target.display(), bytes, "object saved");
                Ok(target)
            }
            Err(e) => {
                drop(file);
                if delete_on_failure {
                    let _ = tokio::fs::remove_file(&target).await;
                }
                Err(e)
            }
        }
    }

    /// Fetch the whole object into memory.
    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.size.min(READ_PREALLOC_LIMIT) as usize);
        self.driver
            .download_object(&self.container, &self.name, &mut buf)
            .await?;
        Ok(buf)
    }

    /// A URL that triggers a browser download, valid for `timeout` where the
    /// backend supports expiry.
    ///
    /// `name` renames the downloaded file and only applies to local storage.
    pub fn download_url(&self, timeout: Duration, name: Option<&str>) -> Result<String> {
        let kind = self.driver.kind();
        let expires = i64::try_from(timeout.as_secs())
            .ok()
            .and_then(|secs| chrono::Utc::now().timestamp().checked_add(secs))
            .ok_or_else(|| {
                CloudyError::Unsupported(format!("expiry of {timeout:?} is out of range"))
            })?;

        match kind {
            ProviderType::Local => {
                let base = self.resolver().file_server_url(&self.name, true)?;
                let mut query = url::form_urlencoded::Serializer::new(String::new());
                query.append_pair("dl", "1");
                if let Some(n) = name {
                    query.append_pair("name", n);
                }
                Ok(format!("{base}?{}", query.finish()))
            }
            ProviderType::S3 | ProviderType::S3Compatible | ProviderType::Gcs => {
                let credentials = self.driver.credentials();
                let (Some(key), Some(secret)) = (&credentials.key, &credentials.secret) else {
                    return Err(CloudyError::Unsupported(format!(
                        "signed URLs for {kind} need an access key and secret"
                    )));
                };
                signing::presign(&self.secure_url()?, kind, key, secret, &self.path(), expires)
            }
            _ if self.driver.capabilities().temp_url => {
                self.driver
                    .temp_url(&self.container, &self.descriptor(), "GET", expires)
            }
            _ => Err(CloudyError::Unsupported(format!(
                "provider '{}' has no signed URL support",
                self.provider_name()
            ))),
        }
    }

    /// Delete from the backend. The object is consumed.
    pub async fn delete(self) -> Result<()> {
        self.driver
            .delete_object(&self.container, &self.name)
            .await?;
        tracing::info!(container = %self.container.name, object = %self.name, "object deleted");
        Ok(())
    }
}

/// `relative` as a path that stays below the directory it is joined to.
fn contained_path(relative: &str) -> Result<&Path> {
    let path = Path::new(relative);
    let contained = path.components().next().is_some()
        && path.components().all(|c| matches!(c, Component::Normal(_)));
    if !contained {
        return Err(CloudyError::InvalidObjectName(relative.to_string()));
    }
    Ok(path)
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("hash", &self.hash)
            .field("container", &self.container.name)
            .field("provider", &self.driver.kind())
            .finish()
    }
}
