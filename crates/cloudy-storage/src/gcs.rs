#[cfg(feature = "gcs")]
mod inner {
    use std::path::Path;

    use async_trait::async_trait;
    use cloudy_core::error::{CloudyError, Result};
    use cloudy_core::types::{Credentials, ProviderType};
    use google_cloud_storage::client::{Client, ClientConfig};
    use google_cloud_storage::http;
    use google_cloud_storage::http::object_access_controls::PredefinedObjectAcl;
    use google_cloud_storage::http::objects::Object;
    use google_cloud_storage::http::objects::delete::DeleteObjectRequest;
    use google_cloud_storage::http::objects::download::Range;
    use google_cloud_storage::http::objects::get::GetObjectRequest;
    use google_cloud_storage::http::objects::list::ListObjectsRequest;
    use google_cloud_storage::http::objects::upload::{UploadObjectRequest, UploadType};
    use tokio::io::{AsyncWrite, AsyncWriteExt};

    use crate::driver::{
        ByteReader, Container, Metadata, ObjectDescriptor, StorageDriver, read_all, split_acl,
    };

    /// Google Cloud Storage driver.
    pub struct GcsStorageDriver {
        client: Client,
        name: String,
        credentials: Credentials,
    }

    impl GcsStorageDriver {
        /// Create using application default credentials.
        ///
        /// `credentials` is the HMAC key pair used for signed download URLs;
        /// API calls always go through the default credentials.
        pub async fn new(name: &str, credentials: Credentials) -> Result<Self> {
            let config = ClientConfig::default()
                .with_auth()
                .await
                .map_err(CloudyError::backend)?;
            let client = Client::new(config);

            Ok(Self {
                client,
                name: name.to_string(),
                credentials,
            })
        }

        fn map_not_found(err: http::Error, not_found: CloudyError) -> CloudyError {
            match err {
                http::Error::Response(ref e) if e.code == 404 => not_found,
                other => CloudyError::backend(other),
            }
        }

        fn describe(object: Object) -> ObjectDescriptor {
            ObjectDescriptor {
                name: object.name,
                size: object.size.max(0) as u64,
                hash: object.md5_hash,
                extra: Metadata::new(),
                meta_data: object.metadata.unwrap_or_default(),
            }
        }
    }

    #[async_trait]
    impl StorageDriver for GcsStorageDriver {
        fn kind(&self) -> ProviderType {
            ProviderType::Gcs
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn credentials(&self) -> &Credentials {
            &self.credentials
        }

        async fn get_container(&self, name: &str) -> Result<Container> {
            // List objects with max_results=1 to verify the bucket exists
            self.client
                .list_objects(&ListObjectsRequest {
                    bucket: name.to_string(),
                    max_results: Some(1),
                    ..Default::default()
                })
                .await
                .map_err(|e| {
                    Self::map_not_found(e, CloudyError::ContainerNotFound(name.to_string()))
                })?;
            Ok(Container::new(name))
        }

        async fn list_objects(&self, container: &Container) -> Result<Vec<ObjectDescriptor>> {
            let mut objects = Vec::new();
            let mut page_token: Option<String> = None;

            loop {
                let resp = self
                    .client
                    .list_objects(&ListObjectsRequest {
                        bucket: container.name.clone(),
                        page_token: page_token.clone(),
                        ..Default::default()
                    })
                    .await
                    .map_err(CloudyError::backend)?;

                objects.extend(resp.items.unwrap_or_default().into_iter().map(Self::describe));

                match resp.next_page_token {
                    Some(token) if !token.is_empty() => page_token = Some(token),
                    _ => break,
                }
            }

            Ok(objects)
        }

        async fn get_object(&self, container: &Container, name: &str) -> Result<ObjectDescriptor> {
            let object = self
                .client
                .get_object(&GetObjectRequest {
                    bucket: container.name.clone(),
                    object: name.to_string(),
                    ..Default::default()
                })
                .await
                .map_err(|e| {
                    Self::map_not_found(e, CloudyError::object_not_found(&container.name, name))
                })?;
            Ok(Self::describe(object))
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
            let data = read_all(stream).await?;
            let (acl, meta) = split_acl(extra);
            let predefined_acl = match acl.as_deref() {
                Some("public-read") => Some(PredefinedObjectAcl::PublicRead),
                _ => None,
            };
            let upload_type = UploadType::Multipart(Box::new(Object {
                name: name.to_string(),
                metadata: (!meta.is_empty()).then_some(meta),
                ..Default::default()
            }));

            let object = self
                .client
                .upload_object(
                    &UploadObjectRequest {
                        bucket: container.name.clone(),
                        predefined_acl,
                        ..Default::default()
                    },
                    data,
                    &upload_type,
                )
                .await
                .map_err(CloudyError::backend)?;
            tracing::debug!(bucket = %container.name, object = name, "gcs object written");

            let mut descriptor = Self::describe(object);
            descriptor.extra = extra.clone();
            Ok(descriptor)
        }

        async fn download_object(
            &self,
            container: &Container,
            name: &str,
            dest: &mut (dyn AsyncWrite + Send + Unpin),
        ) -> Result<u64> {
            let data = self
                .client
                .download_object(
                    &GetObjectRequest {
                        bucket: container.name.clone(),
                        object: name.to_string(),
                        ..Default::default()
                    },
                    &Range::default(),
                )
                .await
                .map_err(|e| {
                    Self::map_not_found(e, CloudyError::object_not_found(&container.name, name))
                })?;
            dest.write_all(&data).await?;
            dest.flush().await?;
            Ok(data.len() as u64)
        }

        async fn delete_object(&self, container: &Container, name: &str) -> Result<()> {
            self.client
                .delete_object(&DeleteObjectRequest {
                    bucket: container.name.clone(),
                    object: name.to_string(),
                    ..Default::default()
                })
                .await
                .map_err(|e| {
                    Self::map_not_found(e, CloudyError::object_not_found(&container.name, name))
                })?;
            Ok(())
        }

        async fn test_connection(&self) -> Result<()> {
            // No bucket is bound to the driver; a token fetch proves the credentials work.
            ClientConfig::default()
                .with_auth()
                .await
                .map_err(CloudyError::backend)?;
            Ok(())
        }
    }
}

#[cfg(feature = "gcs")]
pub use inner::GcsStorageDriver;
