//! Public URL resolution across backends.

use cloudy_core::config::StorageConfig;
use cloudy_core::error::{CloudyError, Result};
use cloudy_core::types::ProviderType;
use url::Url;

use crate::driver::{Container, ObjectDescriptor, StorageDriver};

const GCS_HOST: &str = "storage.googleapis.com";
const AZURE_HOST_SUFFIX: &str = "blob.core.windows.net";

/// Flags controlling URL shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrlOptions {
    /// Rewrite to `https`.
    pub secure: bool,
    /// For local storage, prefix the configured `public_url`.
    pub long_url: bool,
}

impl UrlOptions {
    pub fn secure() -> Self {
        Self {
            secure: true,
            long_url: true,
        }
    }

    pub fn long() -> Self {
        Self {
            secure: false,
            long_url: true,
        }
    }
}

/// Derives a retrievable URL for objects of one container.
pub struct UrlResolver<'a> {
    driver: &'a dyn StorageDriver,
    container: &'a Container,
    config: &'a StorageConfig,
}

impl<'a> UrlResolver<'a> {
    pub fn new(
        driver: &'a dyn StorageDriver,
        container: &'a Container,
        config: &'a StorageConfig,
    ) -> Self {
        Self {
            driver,
            container,
            config,
        }
    }

    pub fn resolve(&self, object: &ObjectDescriptor, opts: UrlOptions) -> Result<String> {
        let kind = self.driver.kind();
        if kind == ProviderType::Local {
            return self.file_server_url(&object.name, opts.long_url);
        }

        let url = if self.driver.capabilities().native_url {
            self.driver.native_url(self.container, object)?.to_string()
        } else {
            self.manual_url(&object.name)?
        };

        if opts.secure {
            to_secure(url, kind)
        } else {
            Ok(url)
        }
    }

    /// `/{serve_files_url}/{name}`, fully qualified when `long_url` and a
    /// `public_url` is configured.
    pub fn file_server_url(&self, name: &str, long_url: bool) -> Result<String> {
        let segments = self
            .config
            .serve_files_url
            .split('/')
            .chain(name.split('/'))
            .filter(|s| !s.is_empty());
        let path = encode_path(segments)?;
        match (&self.config.public_url, long_url) {
            (Some(public), true) if !public.trim().is_empty() => {
                Ok(format!("{}{path}", public.trim().trim_end_matches('/')))
            }
            _ => Ok(path),
        }
    }

    fn manual_url(&self, name: &str) -> Result<String> {
        let kind = self.driver.kind();
        let host = match kind {
            ProviderType::S3 | ProviderType::S3Compatible => self
                .driver
                .host()
                .ok_or_else(|| {
                    CloudyError::Unsupported(format!("{} does not expose a host", self.driver.name()))
                })?
                .to_string(),
            ProviderType::Gcs => GCS_HOST.to_string(),
            ProviderType::Azure => {
                let account = self.driver.credentials().key.as_deref().ok_or_else(|| {
                    CloudyError::Unsupported("Azure URLs need the account name as key".to_string())
                })?;
                format!("{account}.{AZURE_HOST_SUFFIX}")
            }
            _ => {
                return Err(CloudyError::Unsupported(format!(
                    "{} ({kind}) has no object URL",
                    self.driver.name()
                )));
            }
        };
        let path = encode_path(
            std::iter::once(self.container.name.as_str()).chain(name.split('/')),
        )?;
        Ok(format!("http://{host}{path}"))
    }
}

/// Percent-encode each segment and join them into an absolute path.
fn encode_path<'s>(segments: impl IntoIterator<Item = &'s str>) -> Result<String> {
    let mut url = Url::parse("http://localhost/")?;
    url.path_segments_mut()
        .map_err(|_| CloudyError::Unsupported("cannot build URL path".to_string()))?
        .clear()
        .extend(segments);
    Ok(url.path().to_string())
}

/// `http` becomes `https`. Cloudfiles CDN hosts also swap their second label
/// for `ssl`. Relative and non-http URLs are returned unchanged.
fn to_secure(url: String, kind: ProviderType) -> Result<String> {
    let Ok(mut parsed) = Url::parse(&url) else {
        return Ok(url);
    };
    if parsed.scheme() != "http" {
        return Ok(url);
    }
    if kind == ProviderType::Cloudfiles {
        if let Some(host) = parsed.host_str() {
            let mut labels: Vec<&str> = host.split('.').collect();
            if labels.len() > 1 {
                labels[1] = "ssl";
                let ssl_host = labels.join(".");
                parsed.set_host(Some(&ssl_host))?;
            }
        }
    }
    parsed
        .set_scheme("https")
        .map_err(|_| CloudyError::Unsupported(format!("cannot make {url} secure")))?;
    Ok(parsed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{ByteReader, Capabilities, Metadata};
    use async_trait::async_trait;
    use cloudy_core::types::Credentials;
    use std::path::Path;
    use tokio::io::AsyncWrite;

    struct UrlOnlyDriver {
        kind: ProviderType,
        credentials: Credentials,
        native: Option<&'static str>,
    }

    impl UrlOnlyDriver {
        fn new(kind: ProviderType) -> Self {
            Self {
                kind,
                credentials: Credentials::new(Some("account"), Some("secret")),
                native: None,
            }
        }
    }

    #[async_trait]
    impl StorageDriver for UrlOnlyDriver {
        fn kind(&self) -> ProviderType {
            self.kind
        }
        fn name(&self) -> &str {
            "url-only"
        }
        fn credentials(&self) -> &Credentials {
            &self.credentials
        }
        fn capabilities(&self) -> Capabilities {
            Capabilities {
                native_url: self.native.is_some(),
                temp_url: false,
            }
        }
        fn host(&self) -> Option<&str> {
            Some("s3.amazonaws.com")
        }
        async fn get_container(&self, name: &str) -> Result<Container> {
            Ok(Container::new(name))
        }
        async fn list_objects(&self, _: &Container) -> Result<Vec<ObjectDescriptor>> {
            Ok(Vec::new())
        }
        async fn get_object(&self, c: &Container, name: &str) -> Result<ObjectDescriptor> {
            Err(CloudyError::object_not_found(&c.name, name))
        }
        async fn put_object(
            &self,
            _: &Container,
            _: &str,
            _: &Path,
            _: &Metadata,
        ) -> Result<ObjectDescriptor> {
            Err(CloudyError::Unsupported("put".into()))
        }
        async fn put_object_stream(
            &self,
            _: &Container,
            _: &str,
            _: ByteReader,
            _: &Metadata,
        ) -> Result<ObjectDescriptor> {
            Err(CloudyError::Unsupported("put".into()))
        }
        async fn download_object(
            &self,
            _: &Container,
            _: &str,
            _: &mut (dyn AsyncWrite + Send + Unpin),
        ) -> Result<u64> {
            Err(CloudyError::Unsupported("download".into()))
        }
        async fn delete_object(&self, _: &Container, _: &str) -> Result<()> {
            Ok(())
        }
        fn native_url(&self, _: &Container, object: &ObjectDescriptor) -> Result<Url> {
            let base = self.native.ok_or_else(|| CloudyError::Unsupported("native".into()))?;
            Ok(Url::parse(base)?.join(&object.name)?)
        }
        async fn test_connection(&self) -> Result<()> {
            Ok(())
        }
    }

    fn object(name: &str) -> ObjectDescriptor {
        ObjectDescriptor {
            name: name.to_string(),
            ..ObjectDescriptor::default()
        }
    }

    fn resolve(driver: &UrlOnlyDriver, config: &StorageConfig, name: &str, opts: UrlOptions) -> String {
        let container = Container::new("bucket");
        UrlResolver::new(driver, &container, config)
            .resolve(&object(name), opts)
            .unwrap()
    }

    #[test]
    fn local_urls_point_at_file_server() {
        let driver = UrlOnlyDriver::new(ProviderType::Local);
        let mut config = StorageConfig::default();
        assert_eq!(
            resolve(&driver, &config, "a/b.txt", UrlOptions::default()),
            "/files/a/b.txt"
        );
        // No public_url: long form stays relative.
        assert_eq!(resolve(&driver, &config, "b.txt", UrlOptions::long()), "/files/b.txt");

        config.public_url = Some("http://example.com/".to_string());
        assert_eq!(
            resolve(&driver, &config, "b.txt", UrlOptions::long()),
            "http://example.com/files/b.txt"
        );
        assert_eq!(
            resolve(&driver, &config, "b.txt", UrlOptions::default()),
            "/files/b.txt"
        );
    }

    #[test]
    fn local_url_encodes_segments() {
        let driver = UrlOnlyDriver::new(ProviderType::Local);
        let config = StorageConfig::default();
        assert_eq!(
            resolve(&driver, &config, "my dir/hello world.txt", UrlOptions::default()),
            "/files/my%20dir/hello%20world.txt"
        );
    }

    #[test]
    fn manual_urls_per_family() {
        let config = StorageConfig::default();
        let s3 = UrlOnlyDriver::new(ProviderType::S3);
        assert_eq!(
            resolve(&s3, &config, "a/x.png", UrlOptions::default()),
            "http://s3.amazonaws.com/bucket/a/x.png"
        );
        assert_eq!(
            resolve(&s3, &config, "a/x.png", UrlOptions::secure()),
            "https://s3.amazonaws.com/bucket/a/x.png"
        );

        let gcs = UrlOnlyDriver::new(ProviderType::Gcs);
        assert_eq!(
            resolve(&gcs, &config, "x.png", UrlOptions::secure()),
            "https://storage.googleapis.com/bucket/x.png"
        );

        let azure = UrlOnlyDriver::new(ProviderType::Azure);
        assert_eq!(
            resolve(&azure, &config, "x.png", UrlOptions::default()),
            "http://account.blob.core.windows.net/bucket/x.png"
        );
    }

    #[test]
    fn cloudfiles_secure_swaps_second_label() {
        let config = StorageConfig::default();
        let mut driver = UrlOnlyDriver::new(ProviderType::Cloudfiles);
        driver.native = Some("http://c1234.r12.cf1.rackcdn.com/");
        assert_eq!(
            resolve(&driver, &config, "x.png", UrlOptions::default()),
            "http://c1234.r12.cf1.rackcdn.com/x.png"
        );
        assert_eq!(
            resolve(&driver, &config, "x.png", UrlOptions::secure()),
            "https://c1234.ssl.cf1.rackcdn.com/x.png"
        );
    }

    #[test]
    fn unknown_family_without_native_url_is_unsupported() {
        let config = StorageConfig::default();
        let driver = UrlOnlyDriver::new(ProviderType::Other);
        let container = Container::new("bucket");
        let err = UrlResolver::new(&driver, &container, &config)
            .resolve(&object("x.png"), UrlOptions::default())
            .unwrap_err();
        assert!(matches!(err, CloudyError::Unsupported(_)));
    }

    #[test]
    fn secure_leaves_relative_and_https_alone() {
        assert_eq!(
            to_secure("/files/x.txt".to_string(), ProviderType::Local).unwrap(),
            "/files/x.txt"
        );
        assert_eq!(
            to_secure("https://h/x".to_string(), ProviderType::S3).unwrap(),
            "https://h/x"
        );
    }
}
