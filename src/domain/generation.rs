use crate::domain::storage::UpstreamError;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_SIZE: &str = "auto";

/// Reference image as received from the client
#[derive(Debug, Clone)]
pub struct ReferenceImage {
  pub data: Bytes,
  pub content_type: Option<String>,
  pub filename: Option<String>,
}

/// Inbound image-to-image request, alive for one HTTP call
#[derive(Debug, Clone)]
pub struct GenerationRequest {
  pub image: ReferenceImage,
  pub prompt: String,
  pub model: Option<String>,
  pub aspect_ratio: Option<String>,
}

impl GenerationRequest {
  /// Provider `size`, defaulting to `auto`
  pub fn size(&self) -> &str {
    self
      .aspect_ratio
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .unwrap_or(DEFAULT_SIZE)
  }
}

/// Body of `POST /v1/images/generations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGenerationPayload {
  pub model: String,
  pub prompt: String,
  pub size: String,
  pub quality: String,
  pub image_urls: Vec<String>,
}

/// Provider task handle, used by clients to poll for results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationTaskHandle {
  pub id: String,
}

#[derive(Debug, Error)]
pub enum GenerationError {
  #[error("Generation API error: {0}")]
  Upstream(UpstreamError),
  #[error("Generation API request failed: {0}")]
  Transport(String),
  #[error("Invalid generation API response: {0}")]
  InvalidResponse(String),
}

#[async_trait]
pub trait GenerationProvider: Send + Sync + 'static {
  /// Model and quality the provider is configured with
  fn model(&self) -> &str;
  fn quality(&self) -> &str;

  /// Submit an asynchronous generation task
  async fn submit(
    &self,
    payload: &ImageGenerationPayload,
  ) -> Result<GenerationTaskHandle, GenerationError>;
}
