/// File-server routes exercised in-process with `oneshot`.
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use cloudy_core::config::StorageConfig;
use cloudy_storage::{Storage, UploadOptions, UploadSource};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

async fn storage_with(config: impl FnOnce(&mut StorageConfig)) -> (TempDir, Storage) {
    let tmp = TempDir::new().unwrap();
    let mut cfg = StorageConfig::local(tmp.path());
    config(&mut cfg);
    let storage = Storage::initialize(cfg).await.unwrap();
    storage
        .upload(
            UploadSource::bytes("notes.txt", b"hello files".to_vec()),
            UploadOptions {
                prefix: Some("docs".to_string()),
                ..UploadOptions::default()
            },
        )
        .await
        .unwrap();
    (tmp, storage)
}

async fn get(storage: &Storage, uri: &str) -> axum::response::Response {
    cloudy_web::build_router(storage.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn serves_object_inline() {
    let (_tmp, storage) = storage_with(|_| {}).await;
    let resp = get(&storage, "/files/docs/notes.txt").await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert!(resp.headers().get(header::CONTENT_DISPOSITION).is_none());

    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"hello files");
}

#[tokio::test]
async fn download_flag_sets_attachment() {
    let (_tmp, storage) = storage_with(|_| {}).await;

    let resp = get(&storage, "/files/docs/notes.txt?dl=1").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"notes.txt\""
    );

    let resp = get(&storage, "/files/docs/notes.txt?dl=1&name=summary").await;
    assert_eq!(
        resp.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"summary.txt\""
    );
}

#[tokio::test]
async fn download_url_round_trips_through_router() {
    let (_tmp, storage) = storage_with(|_| {}).await;
    let object = storage.get("docs/notes.txt").await.unwrap().unwrap();
    let url = object
        .download_url(std::time::Duration::from_secs(60), Some("my notes"))
        .unwrap();
    assert_eq!(url, "/files/docs/notes.txt?dl=1&name=my+notes");

    let resp = get(&storage, &url).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"my notes.txt\""
    );
}

#[tokio::test]
async fn missing_object_is_404() {
    let (_tmp, storage) = storage_with(|_| {}).await;
    let resp = get(&storage, "/files/nope.txt").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn traversal_is_404() {
    let (_tmp, storage) = storage_with(|_| {}).await;
    for uri in ["/files/..%2Fsecret.txt", "/files/docs/../../secret.txt"] {
        assert_eq!(get(&storage, uri).await.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn custom_prefix() {
    let (_tmp, storage) = storage_with(|c| c.serve_files_url = "/static/media/".to_string()).await;
    assert_eq!(
        get(&storage, "/static/media/docs/notes.txt").await.status(),
        StatusCode::OK
    );
    assert_eq!(
        get(&storage, "/files/docs/notes.txt").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn serving_disabled() {
    let (_tmp, storage) = storage_with(|c| c.serve_files = false).await;
    assert_eq!(
        get(&storage, "/files/docs/notes.txt").await.status(),
        StatusCode::NOT_FOUND
    );

    let (_tmp, storage) = storage_with(|c| c.serve_files_url = " / ".to_string()).await;
    assert_eq!(
        get(&storage, "/files/docs/notes.txt").await.status(),
        StatusCode::NOT_FOUND
    );
}
