use crate::domain::{generation::GenerationError, storage::StorageError, storage::UpstreamError};
use axum::{
  extract::multipart::{MultipartError, MultipartRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use thiserror::Error;

pub const UNAUTHENTICATED_MESSAGE: &str = "Unauthenticated";
pub const MISSING_IMAGE_MESSAGE: &str = "Please upload a reference image";
pub const MISSING_PROMPT_MESSAGE: &str = "Please enter a prompt";
pub const GENERATION_FAILED_MESSAGE: &str = "Generation failed";

#[derive(Error, Debug)]
pub enum ApiError {
  #[error("Unauthenticated")]
  Unauthenticated,

  #[error("{0}")]
  BadRequest(&'static str),

  #[error("Invalid form data: {0}")]
  Multipart(#[from] MultipartError),

  #[error("Invalid form data: {0}")]
  NotMultipart(#[from] MultipartRejection),

  #[error(transparent)]
  Storage(#[from] StorageError),

  #[error(transparent)]
  Generation(#[from] GenerationError),
}

/// JSON body for every failed request
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
  pub code: u16,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<serde_json::Value>,
}

impl ApiError {
  fn upstream(&self) -> Option<&UpstreamError> {
    match self {
      ApiError::Storage(StorageError::Upstream(upstream)) => Some(upstream),
      ApiError::Generation(GenerationError::Upstream(upstream)) => Some(upstream),
      _ => None,
    }
  }

  pub fn status_code(&self) -> StatusCode {
    match self {
      ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Multipart(e) => e.status(),
      ApiError::NotMultipart(e) => e.status(),
      ApiError::Storage(StorageError::Fetch {
        status: Some(status),
        ..
      }) => status_or_internal(*status),
      _ => self
        .upstream()
        .and_then(|u| u.status)
        .map(status_or_internal)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
    }
  }

  pub fn envelope(&self) -> ErrorEnvelope {
    let code = self.status_code().as_u16();

    // Client errors are `{code, message}` only
    let client_message = match self {
      ApiError::Unauthenticated | ApiError::BadRequest(_) => Some(self.to_string()),
      ApiError::Multipart(e) => Some(e.body_text()),
      ApiError::NotMultipart(e) => Some(e.body_text()),
      _ => None,
    };
    if let Some(message) = client_message {
      return ErrorEnvelope {
        code,
        message,
        error: None,
      };
    }

    let upstream = self.upstream();
    let message = upstream
      .and_then(|u| u.message.clone())
      .or_else(|| Some(self.to_string()).filter(|m| !m.is_empty()))
      .unwrap_or_else(|| GENERATION_FAILED_MESSAGE.to_string());
    let error = upstream
      .map(|u| u.body.clone())
      .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

    ErrorEnvelope {
      code,
      message,
      error: Some(error),
    }
  }
}

fn status_or_internal(status: u16) -> StatusCode {
  StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status_code();
    if status.is_server_error() || self.upstream().is_some() {
      tracing::error!("Request failed with {}: {}", status, self);
    } else {
      tracing::debug!("Request rejected with {}: {}", status, self);
    }

    (status, Json(self.envelope())).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_client_errors_have_no_error_field() {
    let envelope = ApiError::Unauthenticated.envelope();
    assert_eq!(
      serde_json::to_value(&envelope).unwrap(),
      serde_json::json!({"code": 401, "message": "Unauthenticated"})
    );

    let envelope = ApiError::BadRequest(MISSING_PROMPT_MESSAGE).envelope();
    assert_eq!(
      serde_json::to_value(&envelope).unwrap(),
      serde_json::json!({"code": 400, "message": "Please enter a prompt"})
    );
  }

  #[test]
  fn test_upstream_status_and_body_pass_through() {
    let body = serde_json::json!({"message": "quota exceeded", "code": "rate_limit"});
    let err = ApiError::Generation(GenerationError::Upstream(UpstreamError::from_body(
      429,
      body.clone(),
    )));

    assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
    let envelope = err.envelope();
    assert_eq!(envelope.code, 429);
    assert_eq!(envelope.message, "quota exceeded");
    assert_eq!(envelope.error, Some(body));
  }

  #[test]
  fn test_upstream_without_message_uses_error_text() {
    let err = ApiError::Generation(GenerationError::Upstream(UpstreamError::from_body(
      503,
      serde_json::json!("unavailable"),
    )));
    let envelope = err.envelope();
    assert_eq!(envelope.code, 503);
    assert_eq!(envelope.message, "Generation API error: upstream returned 503");
    assert_eq!(envelope.error, Some(serde_json::json!("unavailable")));
  }

  #[test]
  fn test_configuration_error_is_internal() {
    let err = ApiError::Storage(StorageError::Configuration);
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let envelope = err.envelope();
    assert_eq!(envelope.code, 500);
    assert_eq!(envelope.message, "Bucket is required");
    assert_eq!(envelope.error, Some(serde_json::json!({})));
  }

  #[test]
  fn test_transport_error_is_internal() {
    let err = ApiError::Generation(GenerationError::Transport("connection refused".to_string()));
    let envelope = err.envelope();
    assert_eq!(envelope.code, 500);
    assert_eq!(
      envelope.message,
      "Generation API request failed: connection refused"
    );
  }
}
