use async_trait::async_trait;
use cloudy_core::error::{CloudyError, Result};
use cloudy_core::types::{Credentials, ProviderType};
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use url::Url;
use walkdir::WalkDir;

use crate::driver::{
    ByteReader, Capabilities, Container, Metadata, ObjectDescriptor, StorageDriver,
};

const COPY_BUF_SIZE: usize = 64 * 1024;

/// Filesystem-based storage driver.
///
/// A container is a directory; object names map to files below it, with `/`
/// segments becoming subdirectories. Custom metadata is not persisted.
pub struct LocalStorageDriver {
    name: String,
    credentials: Credentials,
}

impl LocalStorageDriver {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            credentials: Credentials::default(),
        }
    }

    fn root(container: &Container) -> PathBuf {
        PathBuf::from(container.key.as_deref().unwrap_or(&container.name))
    }

    /// Path of an object, refusing names that would leave the container.
    fn object_path(container: &Container, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = name.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(CloudyError::InvalidObjectName(name.to_string()));
        }
        Ok(Self::root(container).join(relative))
    }

    /// Stream `reader` into `path`, hashing along the way. Removes the partial
    /// file if anything fails.
    async fn write_file(
        path: &Path,
        mut reader: impl AsyncRead + Unpin,
    ) -> Result<(u64, String)> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(path).await?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; COPY_BUF_SIZE];
        let mut size = 0u64;

        let copied: std::io::Result<()> = async {
            loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
                file.write_all(&buf[..n]).await?;
                size += n as u64;
            }
            file.flush().await
        }
        .await;

        if let Err(e) = copied {
            drop(file);
            let _ = tokio::fs::remove_file(path).await;
            return Err(e.into());
        }
        Ok((size, hex::encode(hasher.finalize())))
    }

    /// Remove directories left empty by a delete, up to the container root.
    async fn prune_empty_dirs(root: &Path, path: &Path) {
        let mut dir = path.parent();
        while let Some(d) = dir {
            if d == root || !d.starts_with(root) {
                break;
            }
            // remove_dir fails on non-empty directories, which ends the walk.
            if tokio::fs::remove_dir(d).await.is_err() {
                break;
            }
            dir = d.parent();
        }
    }

    fn not_found(container: &Container, name: &str, e: std::io::Error) -> CloudyError {
        if e.kind() == std::io::ErrorKind::NotFound {
            CloudyError::object_not_found(&container.name, name)
        } else {
            e.into()
        }
    }
}

#[async_trait]
impl StorageDriver for LocalStorageDriver {
    fn kind(&self) -> ProviderType {
        ProviderType::Local
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            native_url: true,
            temp_url: false,
        }
    }

    async fn get_container(&self, name: &str) -> Result<Container> {
        let path = Path::new(name);
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => {
                let canonical = tokio::fs::canonicalize(path).await?;
                Ok(Container {
                    name: name.to_string(),
                    key: Some(canonical.display().to_string()),
                })
            }
            _ => Err(CloudyError::ContainerNotFound(name.to_string())),
        }
    }

    async fn list_objects(&self, container: &Container) -> Result<Vec<ObjectDescriptor>> {
        let root = Self::root(container);
        let mut objects = Vec::new();
        for entry in WalkDir::new(&root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(CloudyError::backend)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&root) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let size = entry.metadata().map_err(CloudyError::backend)?.len();
            objects.push(ObjectDescriptor {
                name,
                size,
                ..ObjectDescriptor::default()
            });
        }
        Ok(objects)
    }

    async fn get_object(&self, container: &Container, name: &str) -> Result<ObjectDescriptor> {
        let path = Self::object_path(container, name)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| Self::not_found(container, name, e))?;
        if !meta.is_file() {
            return Err(CloudyError::object_not_found(&container.name, name));
        }
        Ok(ObjectDescriptor {
            name: name.to_string(),
            size: meta.len(),
            ..ObjectDescriptor::default()
        })
    }

    async fn put_object(
        &self,
        container: &Container,
        name: &str,
        source: &Path,
        extra: &Metadata,
    ) -> Result<ObjectDescriptor> {
        let file = tokio::fs::File::open(source).await?;
        self.put_object_stream(container, name, Box::new(file), extra)
            .await
    }

    async fn put_object_stream(
        &self,
        container: &Container,
        name: &str,
        stream: ByteReader,
        extra: &Metadata,
    ) -> Result<ObjectDescriptor> {
        let path = Self::object_path(container, name)?;
        let (size, hash) = Self::write_file(&path, stream).await?;
        tracing::debug!(path = %path.display(), size, "local object written");
        Ok(ObjectDescriptor {
            name: name.to_string(),
            size,
            hash: Some(hash),
            extra: extra.clone(),
            meta_data: Metadata::new(),
        })
    }

    async fn download_object(
        &self,
        container: &Container,
        name: &str,
        dest: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64> {
        let path = Self::object_path(container, name)?;
        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| Self::not_found(container, name, e))?;
        let copied = tokio::io::copy(&mut file, &mut *dest).await?;
        dest.flush().await?;
        Ok(copied)
    }

    async fn delete_object(&self, container: &Container, name: &str) -> Result<()> {
        let path = Self::object_path(container, name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| Self::not_found(container, name, e))?;
        Self::prune_empty_dirs(&Self::root(container), &path).await;
        Ok(())
    }

    fn native_url(&self, container: &Container, object: &ObjectDescriptor) -> Result<Url> {
        let path = Self::object_path(container, &object.name)?;
        Url::from_file_path(&path).map_err(|_| {
            CloudyError::Unsupported(format!("no file URL for {}", path.display()))
        })
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }
}
