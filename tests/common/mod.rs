//! Common test utilities for integration tests
//!
//! In-memory object store, a multipart body builder and an app factory that
//! wires the router to a wiremock generation API.

use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use std::sync::{Arc, Mutex};

use imagegen_server::domain::config::TokenRegistry;
use imagegen_server::domain::storage::{
  ContentDisposition, ObjectStore, PutOutput, PutRequest, StorageError, UpstreamError,
};
use imagegen_server::domain::yaml_config::{ResolvedGenerationConfig, ResolvedStorageConfig};
use imagegen_server::infra::generation::HttpGenerationClient;
use imagegen_server::infra::session::BearerTokenResolver;
use imagegen_server::infra::storage_client::StorageClient;
use imagegen_server::server::{create_router, AppState};

#[allow(dead_code)]
pub const R2_ENDPOINT: &str = "https://1234567890abcdef1234567890abcdef.r2.cloudflarestorage.com";
#[allow(dead_code)]
pub const SESSION_TOKEN: &str = "token-web";
#[allow(dead_code)]
pub const BOUNDARY: &str = "----imagegen-test-boundary";

/// One write seen by the in-memory store
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedPut {
  pub bucket: String,
  pub key: String,
  pub body: Vec<u8>,
  pub content_type: Option<String>,
  pub disposition: ContentDisposition,
}

/// Object store double that records writes and can be told to fail
#[allow(dead_code)]
#[derive(Default)]
pub struct InMemoryStore {
  pub puts: Mutex<Vec<RecordedPut>>,
  pub fail_with: Mutex<Option<UpstreamError>>,
}

#[allow(dead_code)]
impl InMemoryStore {
  pub fn recorded(&self) -> Vec<RecordedPut> {
    self.puts.lock().unwrap().clone()
  }

  pub fn fail_next(&self, error: UpstreamError) {
    *self.fail_with.lock().unwrap() = Some(error);
  }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
  async fn put(&self, request: PutRequest<'_>) -> Result<PutOutput, StorageError> {
    if let Some(error) = self.fail_with.lock().unwrap().take() {
      return Err(StorageError::Upstream(error));
    }

    self.puts.lock().unwrap().push(RecordedPut {
      bucket: request.bucket.to_string(),
      key: request.key.to_string(),
      body: request.body.to_vec(),
      content_type: request.content_type.map(str::to_string),
      disposition: request.disposition,
    });

    if let Some(on_progress) = &request.on_progress {
      on_progress(50.0);
      on_progress(100.0);
    }

    Ok(PutOutput {
      bucket: request.bucket.to_string(),
      key: request.key.to_string(),
      location: format!("memory://{}/{}", request.bucket, request.key),
    })
  }

  async fn test_connection(&self, _bucket: &str) -> Result<(), StorageError> {
    Ok(())
  }
}

pub fn storage_config(endpoint: Option<&str>, public_domain: Option<&str>) -> ResolvedStorageConfig {
  ResolvedStorageConfig {
    endpoint: endpoint.map(str::to_string),
    region: "auto".to_string(),
    access_key_id: Some("key".to_string()),
    secret_access_key: Some("secret".to_string()),
    default_bucket: "refs".to_string(),
    public_domain: public_domain.map(str::to_string),
    force_path_style: true,
    timeout: 5,
    max_download_bytes: 1024 * 1024,
  }
}

#[allow(dead_code)]
pub fn generation_config(base_url: &str) -> ResolvedGenerationConfig {
  ResolvedGenerationConfig {
    base_url: base_url.to_string(),
    api_key: "sk-test".to_string(),
    model: "nano-banana-2-lite".to_string(),
    quality: "2K".to_string(),
    timeout: 5,
  }
}

/// Router backed by the in-memory store and a generation API at `generation_url`
#[allow(dead_code)]
pub fn create_test_app(store: Arc<InMemoryStore>, generation_url: &str) -> Router {
  create_test_app_with_limit(store, generation_url, 1024 * 1024)
}

#[allow(dead_code)]
pub fn create_test_app_with_limit(
  store: Arc<InMemoryStore>,
  generation_url: &str,
  max_upload_bytes: usize,
) -> Router {
  let storage = StorageClient::new(store, &storage_config(Some(R2_ENDPOINT), None))
    .expect("Failed to create StorageClient");
  let generation = HttpGenerationClient::new(&generation_config(generation_url))
    .expect("Failed to create HttpGenerationClient");
  let sessions = BearerTokenResolver::new(
    TokenRegistry::from_pairs(vec![("web".to_string(), SESSION_TOKEN.to_string())])
      .expect("Failed to build TokenRegistry"),
  );

  let app_state = AppState {
    storage: Arc::new(storage),
    generation: Arc::new(generation),
    sessions: Arc::new(sessions),
    max_upload_bytes,
  };

  create_router(&app_state).with_state(app_state)
}

/// Part of a multipart/form-data body
#[allow(dead_code)]
pub enum Part<'a> {
  Text(&'a str, &'a str),
  File {
    name: &'a str,
    filename: &'a str,
    content_type: &'a str,
    data: &'a [u8],
  },
}

#[allow(dead_code)]
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
  let mut body = Vec::new();

  for part in parts {
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    match part {
      Part::Text(name, value) => {
        body.extend_from_slice(
          format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
      },
      Part::File {
        name,
        filename,
        content_type,
        data,
      } => {
        body.extend_from_slice(
          format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            name, filename, content_type
          )
          .as_bytes(),
        );
        body.extend_from_slice(data);
      },
    }
    body.extend_from_slice(b"\r\n");
  }

  body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
  body
}

/// POST to the image-to-image route with an optional bearer token
#[allow(dead_code)]
pub fn image_to_image_request(token: Option<&str>, parts: &[Part<'_>]) -> Request<Body> {
  let mut builder = Request::builder()
    .method("POST")
    .uri("/api/ai/image-to-image")
    .header(
      "content-type",
      format!("multipart/form-data; boundary={}", BOUNDARY),
    );

  if let Some(token) = token {
    builder = builder.header("authorization", format!("Bearer {}", token));
  }

  builder.body(Body::from(multipart_body(parts))).unwrap()
}

#[allow(dead_code)]
pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
  let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .unwrap();
  serde_json::from_slice(&bytes).unwrap()
}
