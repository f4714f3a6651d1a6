/// Integration tests for the cloud drivers through the storage facade.
///
/// These tests require real cloud credentials and are skipped if env vars are not set.
///
/// Run with:
///   S3_TEST_BUCKET=cloudy-test [S3_TEST_ENDPOINT=http://localhost:9000] \
///   AWS_ACCESS_KEY_ID=... AWS_SECRET_ACCESS_KEY=... \
///   AZURE_STORAGE_ACCOUNT=cloudytest42 AZURE_STORAGE_KEY="..." AZURE_TEST_CONTAINER=cloudy \
///   GCS_TEST_BUCKET=cloudy-test \
///   cargo test -p cloudy-storage --test cloud_providers -- --nocapture
#[allow(unused_imports)]
use cloudy_core::config::StorageConfig;
#[allow(unused_imports)]
use cloudy_storage::{Storage, UploadOptions, UploadSource};

#[allow(dead_code)]
async fn round_trip(storage: &Storage, label: &str) {
    let data = format!("Hello from cloudy integration test - {label}!");
    let name = format!("cloudy-test/{label}.txt");

    let object = storage
        .upload(
            UploadSource::bytes("hello.txt", data.clone().into_bytes()),
            UploadOptions {
                overwrite: true,
                ..UploadOptions::named(&name)
            },
        )
        .await
        .expect("upload failed");
    assert_eq!(object.name, name);
    println!("OK: {label} upload");

    assert!(storage.contains(&name).await.expect("contains failed"));
    println!("OK: {label} object exists");

    let fetched = storage
        .get(&name)
        .await
        .expect("get failed")
        .expect("object missing");
    assert_eq!(fetched.read_bytes().await.expect("download failed"), data.as_bytes());
    println!("OK: {label} download matches");

    let url = fetched.secure_url().expect("url failed");
    assert!(url.starts_with("https://"), "{url}");

    fetched.delete().await.expect("delete failed");
    assert!(!storage.contains(&name).await.expect("contains failed"));
    println!("OK: {label} object deleted");
}

#[cfg(feature = "s3")]
mod s3_tests {
    use super::*;

    async fn get_s3_storage() -> Option<Storage> {
        let bucket = std::env::var("S3_TEST_BUCKET").ok().filter(|b| !b.is_empty())?;
        let endpoint = std::env::var("S3_TEST_ENDPOINT").ok();
        let config = StorageConfig {
            provider: if endpoint.is_some() { "s3compatible" } else { "s3" }.to_string(),
            key: std::env::var("AWS_ACCESS_KEY_ID").ok(),
            secret: std::env::var("AWS_SECRET_ACCESS_KEY").ok(),
            container: bucket,
            region: std::env::var("AWS_REGION").ok(),
            endpoint_url: endpoint,
            ..StorageConfig::default()
        };
        Storage::initialize(config).await.ok()
    }

    #[tokio::test]
    async fn s3_upload_download_delete() {
        let Some(storage) = get_s3_storage().await else {
            eprintln!("SKIP: S3_TEST_BUCKET not set");
            return;
        };
        round_trip(&storage, "s3").await;
    }
}

#[cfg(feature = "azure")]
mod azure_tests {
    use super::*;

    async fn get_azure_storage() -> Option<Storage> {
        let config = StorageConfig {
            provider: "azure".to_string(),
            key: Some(std::env::var("AZURE_STORAGE_ACCOUNT").ok()?),
            secret: Some(std::env::var("AZURE_STORAGE_KEY").ok()?),
            container: std::env::var("AZURE_TEST_CONTAINER").unwrap_or_else(|_| "cloudy".into()),
            ..StorageConfig::default()
        };
        Storage::initialize(config).await.ok()
    }

    #[tokio::test]
    async fn azure_upload_download_delete() {
        let Some(storage) = get_azure_storage().await else {
            eprintln!("SKIP: AZURE_STORAGE_ACCOUNT not set");
            return;
        };
        storage
            .driver()
            .test_connection()
            .await
            .expect("Azure connection failed");
        round_trip(&storage, "azure").await;
    }
}

#[cfg(feature = "gcs")]
mod gcs_tests {
    use super::*;

    async fn get_gcs_storage() -> Option<Storage> {
        let bucket = std::env::var("GCS_TEST_BUCKET").ok()?;
        if bucket.is_empty() {
            return None;
        }
        let config = StorageConfig {
            provider: "gcs".to_string(),
            container: bucket,
            ..StorageConfig::default()
        };
        Storage::initialize(config).await.ok()
    }

    #[tokio::test]
    async fn gcs_upload_download_delete() {
        let Some(storage) = get_gcs_storage().await else {
            eprintln!("SKIP: GCS_TEST_BUCKET not set");
            return;
        };
        round_trip(&storage, "gcs").await;
    }
}
