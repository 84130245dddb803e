use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a remote service, with whatever the response carried.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamError {
  pub status: Option<u16>,
  pub message: Option<String>,
  pub body: serde_json::Value,
}

impl UpstreamError {
  pub fn new(status: Option<u16>, message: Option<String>) -> Self {
    Self {
      status,
      message,
      body: serde_json::Value::Object(Default::default()),
    }
  }

  /// Build from a JSON error body, taking `message` from it when present
  pub fn from_body(status: u16, body: serde_json::Value) -> Self {
    let message = body
      .get("message")
      .and_then(|m| m.as_str())
      .map(str::to_string);
    Self {
      status: Some(status),
      message,
      body,
    }
  }
}

impl fmt::Display for UpstreamError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match (self.status, &self.message) {
      (Some(status), Some(message)) => write!(f, "upstream returned {}: {}", status, message),
      (Some(status), None) => write!(f, "upstream returned {}", status),
      (None, Some(message)) => write!(f, "{}", message),
      (None, None) => write!(f, "upstream request failed"),
    }
  }
}

#[derive(Debug, Error)]
pub enum StorageError {
  #[error("Bucket is required")]
  Configuration,
  #[error("Invalid upload: {0}")]
  InvalidInput(&'static str),
  #[error("Fetch failed: {message}")]
  Fetch {
    status: Option<u16>,
    message: String,
  },
  #[error("Storage operation failed: {0}")]
  Upstream(UpstreamError),
}

/// How a browser should treat the object when fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentDisposition {
  #[default]
  Inline,
  Attachment,
}

impl ContentDisposition {
  pub fn as_header_value(&self) -> &'static str {
    match self {
      ContentDisposition::Inline => "inline",
      ContentDisposition::Attachment => "attachment",
    }
  }
}

/// Receives upload progress as a percentage in `0.0..=100.0`.
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// A single object write as handed to the backend.
pub struct PutRequest<'a> {
  pub bucket: &'a str,
  pub key: &'a str,
  pub body: Bytes,
  pub content_type: Option<&'a str>,
  pub disposition: ContentDisposition,
  pub on_progress: Option<ProgressCallback>,
}

/// What the backend reports back after a write.
#[derive(Debug, Clone, PartialEq)]
pub struct PutOutput {
  pub bucket: String,
  pub key: String,
  /// Provider-native URL of the object; not necessarily public
  pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredObject {
  pub bucket: String,
  pub key: String,
  pub filename: String,
  pub location: String,
  pub url: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
  /// Write the whole body under `bucket/key`
  async fn put(&self, request: PutRequest<'_>) -> Result<PutOutput, StorageError>;

  /// Verify the bucket is reachable with the configured credentials
  async fn test_connection(&self, bucket: &str) -> Result<(), StorageError>;
}

/// Find the first run of 32 lowercase hex characters in `endpoint`.
pub fn extract_account_id(endpoint: &str) -> Option<&str> {
  let bytes = endpoint.as_bytes();
  let mut run_start = 0;

  for (i, b) in bytes.iter().enumerate() {
    if !matches!(b, b'0'..=b'9' | b'a'..=b'f') {
      run_start = i + 1;
      continue;
    }
    if i + 1 - run_start == 32 {
      return Some(&endpoint[run_start..=i]);
    }
  }

  None
}

/// Public URL for a stored object.
///
/// A configured public domain wins; otherwise an R2 account id found in the
/// endpoint yields the `pub-<id>.r2.dev` address. Failing both, the provider
/// location is returned as is.
pub fn derive_public_url(
  public_domain: Option<&str>,
  endpoint: Option<&str>,
  bucket: &str,
  key: &str,
  location: &str,
) -> String {
  if let Some(domain) = public_domain.filter(|d| !d.is_empty()) {
    return format!("{}/{}", domain, key);
  }

  if let Some(account_id) = endpoint.and_then(extract_account_id) {
    return format!("https://pub-{}.r2.dev/{}/{}", account_id, bucket, key);
  }

  tracing::warn!(
    "No public domain or R2 account id available, falling back to provider location for {}",
    key
  );
  location.to_string()
}

/// Last path segment of an object key
pub fn filename_from_key(key: &str) -> &str {
  key.rsplit('/').next().unwrap_or(key)
}
