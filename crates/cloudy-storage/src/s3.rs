#[cfg(feature = "s3")]
mod inner {
    use std::path::Path;

    use async_trait::async_trait;
    use aws_sdk_s3::Client;
    use aws_sdk_s3::primitives::ByteStream;
    use aws_sdk_s3::types::ObjectCannedAcl;
    use cloudy_core::error::{CloudyError, Result};
    use cloudy_core::types::{Credentials, ProviderType};
    use tokio::io::{AsyncWrite, AsyncWriteExt};

    use crate::driver::{
        ByteReader, Container, Metadata, ObjectDescriptor, StorageDriver, read_all, split_acl,
    };

    const DEFAULT_HOST: &str = "s3.amazonaws.com";

    /// AWS S3 and S3-compatible storage driver.
    ///
    /// Works with AWS S3, MinIO, RustFS, Garage, Ceph RGW, SeaweedFS,
    /// and any other service implementing the S3 API.
    pub struct S3StorageDriver {
        client: Client,
        name: String,
        kind: ProviderType,
        credentials: Credentials,
        host: String,
    }

    /// Options for creating an S3 driver.
    pub struct S3Options<'a> {
        pub region: Option<&'a str>,
        pub name: &'a str,
        /// Custom endpoint URL (e.g. `http://localhost:9000` for MinIO).
        pub endpoint_url: Option<&'a str>,
        /// Force path-style addressing (`http://host/bucket/key` instead of `http://bucket.host/key`).
        /// Most S3-compatible servers require this.
        pub path_style: bool,
        /// Explicit access key. If None, uses env/profile credentials.
        pub access_key: Option<&'a str>,
        /// Explicit secret key. If None, uses env/profile credentials.
        pub secret_key: Option<&'a str>,
    }

    impl S3StorageDriver {
        /// Connect with explicit options. An endpoint makes the driver S3-compatible.
        pub async fn with_options(opts: S3Options<'_>) -> Result<Self> {
            let mut config_loader = aws_config::from_env();

            if let Some(r) = opts.region {
                config_loader = config_loader.region(aws_config::Region::new(r.to_string()));
            }

            // If explicit credentials are provided, inject them
            if let (Some(ak), Some(sk)) = (opts.access_key, opts.secret_key) {
                let creds =
                    aws_sdk_s3::config::Credentials::new(ak, sk, None, None, "cloudy-config");
                config_loader = config_loader.credentials_provider(creds);
            }

            let sdk_config = config_loader.load().await;

            let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config);

            if let Some(endpoint) = opts.endpoint_url {
                s3_config_builder = s3_config_builder.endpoint_url(endpoint);
            }

            if opts.path_style {
                s3_config_builder = s3_config_builder.force_path_style(true);
            }

            let client = Client::from_conf(s3_config_builder.build());
            let kind = if opts.endpoint_url.is_some() {
                ProviderType::S3Compatible
            } else {
                ProviderType::S3
            };

            Ok(Self {
                client,
                name: opts.name.to_string(),
                kind,
                credentials: Credentials::new(opts.access_key, opts.secret_key),
                host: object_host(opts.endpoint_url, opts.region)?,
            })
        }

        async fn upload(
            &self,
            container: &Container,
            name: &str,
            body: ByteStream,
            size: u64,
            extra: &Metadata,
        ) -> Result<ObjectDescriptor> {
            let (acl, meta) = split_acl(extra);
            let resp = self
                .client
                .put_object()
                .bucket(&container.name)
                .key(name)
                .body(body)
                .set_acl(acl.as_deref().map(ObjectCannedAcl::from))
                .set_metadata((!meta.is_empty()).then(|| meta.clone()))
                .send()
                .await
                .map_err(CloudyError::backend)?;
            tracing::debug!(bucket = %container.name, key = name, size, "s3 object written");

            Ok(ObjectDescriptor {
                name: name.to_string(),
                size,
                hash: resp.e_tag().map(|t| t.trim_matches('"').to_string()),
                extra: extra.clone(),
                meta_data: meta,
            })
        }
    }

    /// Host serving path-style URLs: the endpoint's host, or the regional AWS host.
    fn object_host(endpoint_url: Option<&str>, region: Option<&str>) -> Result<String> {
        if let Some(endpoint) = endpoint_url {
            let url = url::Url::parse(endpoint)?;
            let host = url
                .host_str()
                .ok_or_else(|| CloudyError::Config(format!("endpoint '{endpoint}' has no host")))?;
            return Ok(match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            });
        }
        Ok(match region {
            None | Some("us-east-1") => DEFAULT_HOST.to_string(),
            Some(r) => format!("s3.{r}.amazonaws.com"),
        })
    }

    #[async_trait]
    impl StorageDriver for S3StorageDriver {
        fn kind(&self) -> ProviderType {
            self.kind
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn credentials(&self) -> &Credentials {
            &self.credentials
        }

        fn host(&self) -> Option<&str> {
            Some(&self.host)
        }

        async fn get_container(&self, name: &str) -> Result<Container> {
            match self.client.head_bucket().bucket(name).send().await {
                Ok(_) => Ok(Container::new(name)),
                Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => {
                    Err(CloudyError::ContainerNotFound(name.to_string()))
                }
                Err(e) => Err(CloudyError::backend(e)),
            }
        }

        async fn list_objects(&self, container: &Container) -> Result<Vec<ObjectDescriptor>> {
            let mut objects = Vec::new();
            let mut continuation_token: Option<String> = None;

            loop {
                let mut req = self.client.list_objects_v2().bucket(&container.name);
                if let Some(token) = &continuation_token {
                    req = req.continuation_token(token);
                }
                let resp = req.send().await.map_err(CloudyError::backend)?;

                for obj in resp.contents() {
                    let Some(key) = obj.key() else { continue };
                    objects.push(ObjectDescriptor {
                        name: key.to_string(),
                        size: obj.size().unwrap_or(0).max(0) as u64,
                        hash: obj.e_tag().map(|t| t.trim_matches('"').to_string()),
                        ..ObjectDescriptor::default()
                    });
                }

                match resp.next_continuation_token() {
                    Some(token) => continuation_token = Some(token.to_string()),
                    None => break,
                }
            }

            Ok(objects)
        }

        async fn get_object(&self, container: &Container, name: &str) -> Result<ObjectDescriptor> {
            let resp = match self
                .client
                .head_object()
                .bucket(&container.name)
                .key(name)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => {
                    return Err(CloudyError::object_not_found(&container.name, name));
                }
                Err(e) => return Err(CloudyError::backend(e)),
            };

            Ok(ObjectDescriptor {
                name: name.to_string(),
                size: resp.content_length().unwrap_or(0).max(0) as u64,
                hash: resp.e_tag().map(|t| t.trim_matches('"').to_string()),
                extra: Metadata::new(),
                meta_data: resp.metadata().cloned().unwrap_or_default(),
            })
        }

        async fn put_object(
            &self,
            container: &Container,
            name: &str,
            source: &Path,
            extra: &Metadata,
        ) -> Result<ObjectDescriptor> {
            let size = tokio::fs::metadata(source).await?.len();
            let body = ByteStream::from_path(source)
                .await
                .map_err(CloudyError::backend)?;
            self.upload(container, name, body, size, extra).await
        }

        async fn put_object_stream(
            &self,
            container: &Container,
            name: &str,
            stream: ByteReader,
            extra: &Metadata,
        ) -> Result<ObjectDescriptor> {
            let data = read_all(stream).await?;
            let size = data.len() as u64;
            self.upload(container, name, ByteStream::from(data), size, extra)
                .await
        }

        async fn download_object(
            &self,
            container: &Container,
            name: &str,
            dest: &mut (dyn AsyncWrite + Send + Unpin),
        ) -> Result<u64> {
            let resp = match self
                .client
                .get_object()
                .bucket(&container.name)
                .key(name)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                    return Err(CloudyError::object_not_found(&container.name, name));
                }
                Err(e) => return Err(CloudyError::backend(e)),
            };
            let mut reader = resp.body.into_async_read();
            let copied = tokio::io::copy(&mut reader, &mut *dest).await?;
            dest.flush().await?;
            Ok(copied)
        }

        async fn delete_object(&self, container: &Container, name: &str) -> Result<()> {
            // S3 deletes are idempotent; check first so a missing key is reported.
            self.get_object(container, name).await?;
            self.client
                .delete_object()
                .bucket(&container.name)
                .key(name)
                .send()
                .await
                .map_err(CloudyError::backend)?;
            Ok(())
        }

        async fn test_connection(&self) -> Result<()> {
            self.client
                .list_buckets()
                .send()
                .await
                .map_err(CloudyError::backend)?;
            Ok(())
        }
    }

}

#[cfg(feature = "s3")]
pub use inner::{S3Options, S3StorageDriver};
