use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use cloudy_core::error::{CloudyError, Result};
use cloudy_core::types::{Credentials, ProviderType};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use url::Url;

/// Source of bytes for streaming uploads.
pub type ByteReader = Box<dyn AsyncRead + Send + Unpin>;

/// Free-form string metadata attached to an object.
pub type Metadata = HashMap<String, String>;

/// Key in `extra` carrying the access policy (`private`, `public-read`, ...).
pub const ACL_KEY: &str = "acl";

/// A named namespace (bucket, blob container, directory) inside one driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub name: String,
    /// Backend-specific root key. The canonical directory for local storage.
    pub key: Option<String>,
}

impl Container {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            key: None,
        }
    }
}

/// What a driver reports about one stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectDescriptor {
    pub name: String,
    pub size: u64,
    pub hash: Option<String>,
    pub extra: Metadata,
    pub meta_data: Metadata,
}

/// Optional capabilities a driver implements beyond the required set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// [`StorageDriver::native_url`] returns a usable URL.
    pub native_url: bool,
    /// [`StorageDriver::temp_url`] returns a time-limited URL.
    pub temp_url: bool,
}

/// Trait for cloud/local storage backends.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Backend family, used for URL and signing dispatch.
    fn kind(&self) -> ProviderType;

    /// Provider name for display.
    fn name(&self) -> &str;

    /// Credentials this driver was connected with.
    fn credentials(&self) -> &Credentials;

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Host serving path-style object URLs, for S3-like backends.
    fn host(&self) -> Option<&str> {
        None
    }

    /// Resolve a container by name.
    async fn get_container(&self, name: &str) -> Result<Container>;

    /// Every object in the container. Order is backend-defined.
    async fn list_objects(&self, container: &Container) -> Result<Vec<ObjectDescriptor>>;

    /// Fails with `ObjectNotFound` when absent.
    async fn get_object(&self, container: &Container, name: &str) -> Result<ObjectDescriptor>;

    /// Upload a local file.
    async fn put_object(
        &self,
        container: &Container,
        name: &str,
        source: &Path,
        extra: &Metadata,
    ) -> Result<ObjectDescriptor>;

    /// Upload from an async reader.
    async fn put_object_stream(
        &self,
        container: &Container,
        name: &str,
        stream: ByteReader,
        extra: &Metadata,
    ) -> Result<ObjectDescriptor>;

    /// Copy the object's bytes into `dest`. Returns the number of bytes written.
    async fn download_object(
        &self,
        container: &Container,
        name: &str,
        dest: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64>;

    async fn delete_object(&self, container: &Container, name: &str) -> Result<()>;

    /// Native CDN/object URL.
    fn native_url(&self, _container: &Container, _object: &ObjectDescriptor) -> Result<Url> {
        Err(CloudyError::Unsupported(format!(
            "{} has no native object URL",
            self.name()
        )))
    }

    /// Time-limited URL valid until `expires` (unix seconds).
    fn temp_url(
        &self,
        _container: &Container,
        _object: &ObjectDescriptor,
        _method: &str,
        _expires: i64,
    ) -> Result<String> {
        Err(CloudyError::Unsupported(format!(
            "{} has no temporary URL support",
            self.name()
        )))
    }

    /// Test connectivity.
    async fn test_connection(&self) -> Result<()>;
}

/// Separate the access policy from the metadata forwarded to the backend.
pub fn split_acl(extra: &Metadata) -> (Option<String>, Metadata) {
    let mut meta = extra.clone();
    let acl = meta.remove(ACL_KEY);
    (acl, meta)
}

/// Drain a reader into memory, for SDKs that upload from a buffer.
pub async fn read_all(mut stream: ByteReader) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    stream.read_to_end(&mut data).await?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acl_is_split_from_metadata() {
        let extra: Metadata = [
            ("acl".to_string(), "public-read".to_string()),
            ("owner".to_string(), "alice".to_string()),
        ]
        .into();
        let (acl, meta) = split_acl(&extra);
        assert_eq!(acl.as_deref(), Some("public-read"));
        assert_eq!(meta.len(), 1);
        assert_eq!(meta["owner"], "alice");
    }

    #[tokio::test]
    async fn read_all_drains_reader() {
        let reader: ByteReader = Box::new(std::io::Cursor::new(b"hello".to_vec()));
        assert_eq!(read_all(reader).await.unwrap(), b"hello");
    }
}
