//! The storage facade: one driver, one active container.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use cloudy_core::config::StorageConfig;
use cloudy_core::error::{CloudyError, Result};
use cloudy_core::naming;
use cloudy_core::types::ProviderType;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tokio::io::AsyncRead;

use crate::driver::{ACL_KEY, ByteReader, Container, Metadata, ObjectDescriptor, StorageDriver};
use crate::factory::{DriverRegistry, create_driver};
use crate::object::Object;

/// Where upload bytes come from.
pub enum UploadSource {
    /// A file on the local filesystem.
    Path(PathBuf),
    /// An in-memory or network stream with its original filename.
    Stream { filename: String, reader: ByteReader },
}

impl UploadSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        UploadSource::Path(path.into())
    }

    pub fn stream(filename: &str, reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        UploadSource::Stream {
            filename: filename.to_string(),
            reader: Box::new(reader),
        }
    }

    pub fn bytes(filename: &str, data: impl Into<Vec<u8>>) -> Self {
        Self::stream(filename, std::io::Cursor::new(data.into()))
    }

    fn filename(&self) -> String {
        match self {
            UploadSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            UploadSource::Stream { filename, .. } => filename.clone(),
        }
    }
}

impl fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            UploadSource::Stream { filename, .. } => {
                f.debug_struct("Stream").field("filename", filename).finish()
            }
        }
    }
}

/// Per-upload knobs. `Default` uploads under the derived name, renaming on
/// collision, with the configured whitelist.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Object name. Derived from the source filename when absent; the
    /// source extension is appended when the name has none.
    pub name: Option<String>,
    /// Directory-like prefix, joined with exactly one `/`.
    pub prefix: Option<String>,
    /// Overrides the configured extension whitelist.
    pub allowed_extensions: Option<Vec<String>>,
    /// Replace an existing object instead of picking a fresh name.
    pub overwrite: bool,
    /// Request `public-read` unless `extra` already carries an `acl`.
    pub public: bool,
    pub extra: Metadata,
}

impl UploadOptions {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }
}

/// Uniform facade over a storage driver bound to one container.
///
/// Cloning is cheap: the driver and configuration are shared.
#[derive(Clone)]
pub struct Storage {
    driver: Arc<dyn StorageDriver>,
    container: Container,
    config: Arc<StorageConfig>,
}

impl Storage {
    /// Validate `config`, connect the driver and resolve the container.
    pub async fn initialize(config: StorageConfig) -> Result<Self> {
        Self::initialize_with(config, &DriverRegistry::default()).await
    }

    /// Like [`Storage::initialize`], consulting `registry` for custom providers.
    pub async fn initialize_with(config: StorageConfig, registry: &DriverRegistry) -> Result<Self> {
        let driver = create_driver(&config, registry).await?;
        let storage = Self::from_driver(driver, config).await?;
        tracing::info!(
            provider = %storage.driver.kind(),
            container = %storage.container.name,
            "storage initialized"
        );
        Ok(storage)
    }

    /// Wrap an already-connected driver.
    pub async fn from_driver(driver: Arc<dyn StorageDriver>, config: StorageConfig) -> Result<Self> {
        let container = driver.get_container(&config.container).await?;
        Ok(Self {
            driver,
            container,
            config: Arc::new(config),
        })
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn driver(&self) -> &Arc<dyn StorageDriver> {
        &self.driver
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    fn wrap(&self, descriptor: ObjectDescriptor) -> Object {
        Object::new(
            descriptor,
            self.container.clone(),
            Arc::clone(&self.driver),
            Arc::clone(&self.config),
        )
    }

    /// Build an [`Object`] handle without contacting the backend.
    pub fn create(&self, descriptor: ObjectDescriptor) -> Object {
        self.wrap(descriptor)
    }

    /// `None` when the backend reports the object missing.
    pub async fn get(&self, name: &str) -> Result<Option<Object>> {
        match self.driver.get_object(&self.container, name).await {
            Ok(descriptor) => Ok(Some(self.wrap(descriptor))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.get(name).await?.is_some())
    }

    /// Every object in the container. Each call issues a fresh listing.
    pub fn objects(&self) -> BoxStream<'static, Result<Object>> {
        let this = self.clone();
        stream::once(async move {
            let listed = this.driver.list_objects(&this.container).await;
            match listed {
                Ok(list) => stream::iter(list.into_iter().map(move |d| Ok(this.wrap(d)))).left_stream(),
                Err(e) => stream::iter(std::iter::once(Err(e))).right_stream(),
            }
        })
        .flatten()
        .boxed()
    }

    /// Number of objects. Enumerates the whole container.
    pub async fn len(&self) -> Result<usize> {
        Ok(self.driver.list_objects(&self.container).await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Resolve the final object name for an upload. No bytes move and no
    /// backend call is made before the extension check.
    async fn upload_name(&self, source_filename: &str, opts: &UploadOptions) -> Result<String> {
        let (name, extension) = naming::derive_upload_name(source_filename, opts.name.as_deref());
        let mut name = naming::normalize_name(&name);
        if self.driver.kind() == ProviderType::Local {
            name = naming::secure_filename(&name);
        }
        if let Some(prefix) = &opts.prefix {
            name = naming::apply_prefix(&name, prefix);
        }
        if name.is_empty() {
            return Err(CloudyError::InvalidObjectName(source_filename.to_string()));
        }

        let allowed: Vec<String> = match &opts.allowed_extensions {
            Some(exts) => exts
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                .collect(),
            None => self.config.allowed_extensions(),
        };
        // Only the source's extension is checked; an explicit name may carry its own.
        if extension.is_empty() || !allowed.contains(&extension) {
            return Err(CloudyError::InvalidExtension(extension));
        }

        if opts.overwrite {
            return Ok(name);
        }
        naming::disambiguate(&name, |candidate| async move { self.contains(&candidate).await }).await
    }

    /// Store `source` and return its object.
    pub async fn upload(&self, source: UploadSource, opts: UploadOptions) -> Result<Object> {
        let name = self.upload_name(&source.filename(), &opts).await?;

        let mut extra = opts.extra;
        if opts.public && !extra.contains_key(ACL_KEY) {
            extra.insert(ACL_KEY.to_string(), "public-read".to_string());
        }

        let mut descriptor = match source {
            UploadSource::Path(path) => {
                self.driver
                    .put_object(&self.container, &name, &path, &extra)
                    .await?
            }
            UploadSource::Stream { reader, .. } => {
                self.driver
                    .put_object_stream(&self.container, &name, reader, &extra)
                    .await?
            }
        };
        descriptor.name = name;

        tracing::info!(
            container = %self.container.name,
            object = %descriptor.name,
            size = descriptor.size,
            "object uploaded"
        );
        Ok(self.wrap(descriptor))
    }

    /// Delete by name. A missing object is an error.
    pub async fn delete(&self, name: &str) -> Result<()> {
        self.driver.delete_object(&self.container, name).await?;
        tracing::info!(container = %self.container.name, object = name, "object deleted");
        Ok(())
    }

    /// A facade bound to `container`, sharing this one's driver and
    /// configuration. Dropping it releases nothing but the handle.
    pub async fn use_container(&self, container: &str) -> Result<Storage> {
        let container = self.driver.get_container(container).await?;
        tracing::debug!(from = %self.container.name, to = %container.name, "switching container");
        Ok(Self {
            driver: Arc::clone(&self.driver),
            container,
            config: Arc::clone(&self.config),
        })
    }
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("provider", &self.driver.kind())
            .field("driver", &self.driver.name())
            .field("container", &self.container)
            .finish()
    }
}
