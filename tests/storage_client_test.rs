//! Storage client tests: bucket resolution, public URLs, progress and re-hosting

mod common;

use bytes::Bytes;
use common::{storage_config, InMemoryStore, R2_ENDPOINT};
use imagegen_server::domain::storage::{ContentDisposition, StorageError};
use imagegen_server::infra::storage_client::{StorageClient, UploadOptions};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_with(
  store: Arc<InMemoryStore>,
  endpoint: Option<&str>,
  public_domain: Option<&str>,
) -> StorageClient {
  StorageClient::new(store, &storage_config(endpoint, public_domain)).unwrap()
}

#[tokio::test]
async fn test_upload_uses_default_bucket_and_r2_public_url() {
  let store = Arc::new(InMemoryStore::default());
  let client = client_with(store.clone(), Some(R2_ENDPOINT), None);

  let stored = client
    .upload_file(Bytes::from_static(b"data"), "k", UploadOptions::default())
    .await
    .unwrap();

  assert_eq!(stored.bucket, "refs");
  assert_eq!(stored.key, "k");
  assert_eq!(stored.filename, "k");
  assert_eq!(stored.location, "memory://refs/k");
  assert_eq!(
    stored.url,
    "https://pub-1234567890abcdef1234567890abcdef.r2.dev/refs/k"
  );

  let puts = store.recorded();
  assert_eq!(puts.len(), 1);
  assert_eq!(puts[0].disposition, ContentDisposition::Inline);
  assert_eq!(puts[0].content_type, None);
}

#[tokio::test]
async fn test_explicit_bucket_wins_over_default() {
  let store = Arc::new(InMemoryStore::default());
  let client = client_with(store.clone(), Some(R2_ENDPOINT), None);

  let stored = client
    .upload_file(
      Bytes::from_static(b"data"),
      "k",
      UploadOptions {
        bucket: Some("b"),
        content_type: Some("image/webp"),
        disposition: ContentDisposition::Attachment,
        ..Default::default()
      },
    )
    .await
    .unwrap();

  assert_eq!(
    stored.url,
    "https://pub-1234567890abcdef1234567890abcdef.r2.dev/b/k"
  );
  let put = &store.recorded()[0];
  assert_eq!(put.bucket, "b");
  assert_eq!(put.content_type.as_deref(), Some("image/webp"));
  assert_eq!(put.disposition, ContentDisposition::Attachment);
}

#[tokio::test]
async fn test_public_domain_override_ignores_endpoint() {
  let client = client_with(
    Arc::new(InMemoryStore::default()),
    Some(R2_ENDPOINT),
    Some("https://cdn.example.com"),
  );

  let stored = client
    .upload_file(
      Bytes::from_static(b"data"),
      "ai-generated/references/2024/01/02/x.png",
      UploadOptions::default(),
    )
    .await
    .unwrap();

  assert_eq!(
    stored.url,
    "https://cdn.example.com/ai-generated/references/2024/01/02/x.png"
  );
  assert_eq!(stored.filename, "x.png");
}

#[tokio::test]
async fn test_non_r2_endpoint_falls_back_to_location() {
  let client = client_with(
    Arc::new(InMemoryStore::default()),
    Some("http://localhost:9000"),
    None,
  );

  let stored = client
    .upload_file(Bytes::from_static(b"data"), "k", UploadOptions::default())
    .await
    .unwrap();

  assert_eq!(stored.url, "memory://refs/k");
}

#[tokio::test]
async fn test_missing_bucket_is_configuration_error() {
  let store = Arc::new(InMemoryStore::default());
  let mut config = storage_config(Some(R2_ENDPOINT), None);
  config.default_bucket = String::new();
  let client = StorageClient::new(store.clone(), &config).unwrap();

  let err = client
    .upload_file(Bytes::from_static(b"data"), "k", UploadOptions::default())
    .await
    .unwrap_err();

  assert!(matches!(err, StorageError::Configuration));
  assert_eq!(err.to_string(), "Bucket is required");
  assert!(store.recorded().is_empty());
}

#[tokio::test]
async fn test_empty_body_or_key_rejected() {
  let store = Arc::new(InMemoryStore::default());
  let client = client_with(store.clone(), Some(R2_ENDPOINT), None);

  let err = client
    .upload_file(Bytes::new(), "k", UploadOptions::default())
    .await
    .unwrap_err();
  assert!(matches!(err, StorageError::InvalidInput(_)));

  let err = client
    .upload_file(Bytes::from_static(b"data"), "", UploadOptions::default())
    .await
    .unwrap_err();
  assert!(matches!(err, StorageError::InvalidInput(_)));

  assert!(store.recorded().is_empty());
}

#[tokio::test]
async fn test_progress_callback_receives_percentages() {
  let client = client_with(Arc::new(InMemoryStore::default()), Some(R2_ENDPOINT), None);
  let seen = Arc::new(Mutex::new(Vec::new()));
  let sink = seen.clone();

  client
    .upload_file(
      Bytes::from_static(b"data"),
      "k",
      UploadOptions {
        on_progress: Some(Arc::new(move |p| sink.lock().unwrap().push(p))),
        ..Default::default()
      },
    )
    .await
    .unwrap();

  assert_eq!(*seen.lock().unwrap(), vec![50.0, 100.0]);
}

#[tokio::test]
async fn test_download_and_upload_rehosts_payload() {
  let remote = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/generated/result.png"))
    .respond_with(
      ResponseTemplate::new(200)
        .insert_header("content-type", "image/png")
        .set_body_bytes(b"remote-image".to_vec()),
    )
    .expect(1)
    .mount(&remote)
    .await;

  let store = Arc::new(InMemoryStore::default());
  let client = client_with(store.clone(), Some(R2_ENDPOINT), None);

  let stored = client
    .download_and_upload(
      &format!("{}/generated/result.png", remote.uri()),
      "ai-generated/results/result.png",
      None,
      None,
      ContentDisposition::Inline,
    )
    .await
    .unwrap();

  assert_eq!(stored.key, "ai-generated/results/result.png");
  let put = &store.recorded()[0];
  assert_eq!(put.body, b"remote-image");
  assert_eq!(put.content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn test_download_explicit_content_type_wins() {
  let remote = MockServer::start().await;
  Mock::given(method("GET"))
    .respond_with(
      ResponseTemplate::new(200)
        .insert_header("content-type", "application/octet-stream")
        .set_body_bytes(b"remote-image".to_vec()),
    )
    .mount(&remote)
    .await;

  let store = Arc::new(InMemoryStore::default());
  let client = client_with(store.clone(), Some(R2_ENDPOINT), None);

  client
    .download_and_upload(
      &remote.uri(),
      "k.jpg",
      Some("other"),
      Some("image/jpeg"),
      ContentDisposition::Attachment,
    )
    .await
    .unwrap();

  let put = &store.recorded()[0];
  assert_eq!(put.bucket, "other");
  assert_eq!(put.content_type.as_deref(), Some("image/jpeg"));
  assert_eq!(put.disposition, ContentDisposition::Attachment);
}

#[tokio::test]
async fn test_download_not_found_fails_before_upload() {
  let remote = MockServer::start().await;
  Mock::given(method("GET"))
    .respond_with(ResponseTemplate::new(404))
    .mount(&remote)
    .await;

  let store = Arc::new(InMemoryStore::default());
  let client = client_with(store.clone(), Some(R2_ENDPOINT), None);

  let err = client
    .download_and_upload(
      &format!("{}/missing.png", remote.uri()),
      "k",
      None,
      None,
      ContentDisposition::Inline,
    )
    .await
    .unwrap_err();

  match err {
    StorageError::Fetch { status, .. } => assert_eq!(status, Some(404)),
    other => panic!("Expected Fetch error, got {:?}", other),
  }
  assert!(store.recorded().is_empty());
}

#[tokio::test]
async fn test_download_empty_body_fails() {
  let remote = MockServer::start().await;
  Mock::given(method("GET"))
    .respond_with(ResponseTemplate::new(200))
    .mount(&remote)
    .await;

  let store = Arc::new(InMemoryStore::default());
  let client = client_with(store.clone(), Some(R2_ENDPOINT), None);

  let err = client
    .download_and_upload(&remote.uri(), "k", None, None, ContentDisposition::Inline)
    .await
    .unwrap_err();

  assert!(matches!(err, StorageError::Fetch { .. }));
  assert!(store.recorded().is_empty());
}

#[tokio::test]
async fn test_download_over_limit_fails() {
  let remote = MockServer::start().await;
  Mock::given(method("GET"))
    .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 2 * 1024 * 1024]))
    .mount(&remote)
    .await;

  let store = Arc::new(InMemoryStore::default());
  let client = client_with(store.clone(), Some(R2_ENDPOINT), None);

  let err = client
    .download_and_upload(&remote.uri(), "k", None, None, ContentDisposition::Inline)
    .await
    .unwrap_err();

  assert!(matches!(err, StorageError::Fetch { status: None, .. }));
  assert!(store.recorded().is_empty());
}
