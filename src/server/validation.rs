use crate::domain::generation::ReferenceImage;
use crate::server::error::{ApiError, MISSING_IMAGE_MESSAGE, MISSING_PROMPT_MESSAGE};

/// An image part counts only when it carries bytes; browsers send an empty
/// part when no file was picked
pub fn require_image(image: Option<ReferenceImage>) -> Result<ReferenceImage, ApiError> {
  match image {
    Some(image) if !image.data.is_empty() => Ok(image),
    _ => Err(ApiError::BadRequest(MISSING_IMAGE_MESSAGE)),
  }
}

pub fn require_prompt(prompt: Option<String>) -> Result<String, ApiError> {
  match prompt {
    Some(prompt) if !prompt.trim().is_empty() => Ok(prompt),
    _ => Err(ApiError::BadRequest(MISSING_PROMPT_MESSAGE)),
  }
}
