use async_trait::async_trait;
use std::time::Duration;

use crate::domain::{
    generation::{GenerationError, GenerationProvider, GenerationTaskHandle, ImageGenerationPayload},
    storage::UpstreamError,
    yaml_config::ResolvedGenerationConfig,
};

pub const GENERATIONS_PATH: &str = "/v1/images/generations";

/// Client for an OpenAI-style asynchronous image generation API
#[derive(Clone)]
pub struct HttpGenerationClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    quality: String,
}

impl HttpGenerationClient {
    pub fn new(config: &ResolvedGenerationConfig) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            quality: config.quality.clone(),
        })
    }
}

#[async_trait]
impl GenerationProvider for HttpGenerationClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn quality(&self) -> &str {
        &self.quality
    }

    async fn submit(
        &self,
        payload: &ImageGenerationPayload,
    ) -> Result<GenerationTaskHandle, GenerationError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, GENERATIONS_PATH))
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Generation API request failed: {:?}", e);
                GenerationError::Transport(e.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        // Non-JSON bodies are kept as a plain string
        let body: serde_json::Value = serde_json::from_str(&text)
            .unwrap_or_else(|_| serde_json::Value::String(text.clone()));

        if !status.is_success() {
            tracing::warn!("Generation API returned {}: {}", status, text);
            return Err(GenerationError::Upstream(UpstreamError::from_body(
                status.as_u16(),
                body,
            )));
        }

        let id = match body.get("id") {
            Some(serde_json::Value::String(id)) if !id.is_empty() => id.clone(),
            Some(serde_json::Value::Number(id)) => id.to_string(),
            _ => {
                return Err(GenerationError::InvalidResponse(format!(
                    "missing task id in response: {}",
                    text
                )))
            }
        };

        Ok(GenerationTaskHandle { id })
    }
}
