#[cfg(feature = "azure")]
mod inner {
    use std::path::Path;

    use async_trait::async_trait;
    use azure_core::StatusCode;
    use azure_core::error::ErrorKind;
    use azure_storage::StorageCredentials;
    use azure_storage_blobs::prelude::*;
    use cloudy_core::error::{CloudyError, Result};
    use cloudy_core::types::{Credentials, ProviderType};
    use futures::StreamExt;
    use tokio::io::{AsyncWrite, AsyncWriteExt};

    use crate::driver::{
        ByteReader, Container, Metadata, ObjectDescriptor, StorageDriver, read_all, split_acl,
    };

    /// Azure Blob Storage driver.
    ///
    /// `extra` is stored as blob metadata. ACLs are not forwarded; blob access
    /// is governed by the container's public access level.
    pub struct AzureStorageDriver {
        service: BlobServiceClient,
        name: String,
        credentials: Credentials,
    }

    impl AzureStorageDriver {
        /// Create from storage account name + access key.
        pub fn new(account: &str, access_key: &str, name: &str) -> Result<Self> {
            let storage_credentials =
                StorageCredentials::access_key(account, access_key.to_string());
            let service = ClientBuilder::new(account, storage_credentials).blob_service_client();

            Ok(Self {
                service,
                name: name.to_string(),
                credentials: Credentials::new(Some(account), Some(access_key)),
            })
        }

        fn blob(&self, container: &Container, name: &str) -> BlobClient {
            self.service
                .container_client(&container.name)
                .blob_client(name)
        }

        fn map_not_found(err: azure_core::Error, not_found: CloudyError) -> CloudyError {
            if matches!(
                err.kind(),
                ErrorKind::HttpResponse {
                    status: StatusCode::NotFound,
                    ..
                }
            ) {
                not_found
            } else {
                CloudyError::backend(err)
            }
        }
    }

    #[async_trait]
    impl StorageDriver for AzureStorageDriver {
        fn kind(&self) -> ProviderType {
            ProviderType::Azure
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn credentials(&self) -> &Credentials {
            &self.credentials
        }

        async fn get_container(&self, name: &str) -> Result<Container> {
            self.service
                .container_client(name)
                .get_properties()
                .await
                .map_err(|e| {
                    Self::map_not_found(e, CloudyError::ContainerNotFound(name.to_string()))
                })?;
            Ok(Container::new(name))
        }

        async fn list_objects(&self, container: &Container) -> Result<Vec<ObjectDescriptor>> {
            let mut stream = self
                .service
                .container_client(&container.name)
                .list_blobs()
                .into_stream();
            let mut objects = Vec::new();
            while let Some(page) = stream.next().await {
                let page = page.map_err(CloudyError::backend)?;
                for blob in page.blobs.blobs() {
                    objects.push(ObjectDescriptor {
                        name: blob.name.clone(),
                        size: blob.properties.content_length,
                        meta_data: blob.metadata.clone().unwrap_or_default(),
                        ..ObjectDescriptor::default()
                    });
                }
            }
            Ok(objects)
        }

        async fn get_object(&self, container: &Container, name: &str) -> Result<ObjectDescriptor> {
            let resp = self
                .blob(container, name)
                .get_properties()
                .await
                .map_err(|e| {
                    Self::map_not_found(e, CloudyError::object_not_found(&container.name, name))
                })?;
            Ok(ObjectDescriptor {
                name: name.to_string(),
                size: resp.blob.properties.content_length,
                meta_data: resp.blob.metadata.unwrap_or_default(),
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
            let data = read_all(stream).await?;
            let size = data.len() as u64;
            let (_, meta) = split_acl(extra);
            let mut request = self.blob(container, name).put_block_blob(data);
            if !meta.is_empty() {
                request = request.metadata(blob_metadata(&meta));
            }
            request.await.map_err(CloudyError::backend)?;
            tracing::debug!(container = %container.name, blob = name, size, "azure blob written");

            Ok(ObjectDescriptor {
                name: name.to_string(),
                size,
                hash: None,
                extra: extra.clone(),
                meta_data: meta,
            })
        }

        async fn download_object(
            &self,
            container: &Container,
            name: &str,
            dest: &mut (dyn AsyncWrite + Send + Unpin),
        ) -> Result<u64> {
            let data = self
                .blob(container, name)
                .get_content()
                .await
                .map_err(|e| {
                    Self::map_not_found(e, CloudyError::object_not_found(&container.name, name))
                })?;
            dest.write_all(&data).await?;
            dest.flush().await?;
            Ok(data.len() as u64)
        }

        async fn delete_object(&self, container: &Container, name: &str) -> Result<()> {
            self.blob(container, name)
                .delete()
                .await
                .map_err(|e| {
                    Self::map_not_found(e, CloudyError::object_not_found(&container.name, name))
                })?;
            Ok(())
        }

        async fn test_connection(&self) -> Result<()> {
            let mut stream = self.service.list_containers().into_stream();
            if let Some(page) = stream.next().await {
                page.map_err(CloudyError::backend)?;
            }
            Ok(())
        }
    }

    fn blob_metadata(meta: &Metadata) -> azure_core::request_options::Metadata {
        let mut out = azure_core::request_options::Metadata::new();
        for (key, value) in meta {
            out.insert(key.clone(), value.clone());
        }
        out
    }

}

#[cfg(feature = "azure")]
pub use inner::AzureStorageDriver;
