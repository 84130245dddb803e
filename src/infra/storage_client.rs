use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{
    storage::{
        derive_public_url, filename_from_key, ContentDisposition, ObjectStore, ProgressCallback,
        PutRequest, StorageError, StoredObject, UpstreamError,
    },
    yaml_config::ResolvedStorageConfig,
};
use crate::infra::aws::S3ObjectStore;

/// Per-call knobs for `upload_file`
#[derive(Default, Clone)]
pub struct UploadOptions<'a> {
    pub content_type: Option<&'a str>,
    /// Falls back to the configured default bucket
    pub bucket: Option<&'a str>,
    pub disposition: ContentDisposition,
    pub on_progress: Option<ProgressCallback>,
}

/// Uploads payloads to object storage and works out where the public can read them
#[derive(Clone)]
pub struct StorageClient {
    store: Arc<dyn ObjectStore>,
    http: reqwest::Client,
    default_bucket: String,
    endpoint: Option<String>,
    public_domain: Option<String>,
    max_download_bytes: u64,
}

impl StorageClient {
    /// Create a client backed by the S3 API described in `config`
    pub async fn from_config(config: &ResolvedStorageConfig) -> Result<Self, StorageError> {
        let store = S3ObjectStore::from_config(config).await?;
        Self::new(Arc::new(store), config)
    }

    pub fn new(
        store: Arc<dyn ObjectStore>,
        config: &ResolvedStorageConfig,
    ) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build download client: {:?}", e);
                StorageError::Upstream(UpstreamError::new(None, Some(e.to_string())))
            })?;

        Ok(Self {
            store,
            http,
            default_bucket: config.default_bucket.clone(),
            endpoint: config.endpoint.clone(),
            public_domain: config.public_domain.clone(),
            max_download_bytes: config.max_download_bytes,
        })
    }

    pub fn default_bucket(&self) -> Option<&str> {
        Some(self.default_bucket.as_str()).filter(|b| !b.is_empty())
    }

    /// Probe the default bucket, if one is configured
    pub async fn test_connection(&self) -> Result<(), StorageError> {
        match self.default_bucket() {
            Some(bucket) => self.store.test_connection(bucket).await,
            None => {
                tracing::warn!("No default bucket configured, skipping connectivity test");
                Ok(())
            }
        }
    }

    /// Store `body` under `key` and return where it ended up
    pub async fn upload_file(
        &self,
        body: Bytes,
        key: &str,
        options: UploadOptions<'_>,
    ) -> Result<StoredObject, StorageError> {
        let bucket = options
            .bucket
            .filter(|b| !b.is_empty())
            .or_else(|| self.default_bucket())
            .ok_or(StorageError::Configuration)?;

        if key.is_empty() {
            return Err(StorageError::InvalidInput("key must not be empty"));
        }
        if body.is_empty() {
            return Err(StorageError::InvalidInput("body must not be empty"));
        }

        tracing::debug!("Uploading {} bytes to {}/{}", body.len(), bucket, key);

        let output = self
            .store
            .put(PutRequest {
                bucket,
                key,
                body,
                content_type: options.content_type,
                disposition: options.disposition,
                on_progress: options.on_progress,
            })
            .await?;

        let url = derive_public_url(
            self.public_domain.as_deref(),
            self.endpoint.as_deref(),
            &output.bucket,
            &output.key,
            &output.location,
        );

        Ok(StoredObject {
            filename: filename_from_key(&output.key).to_string(),
            bucket: output.bucket,
            key: output.key,
            location: output.location,
            url,
        })
    }

    /// Fetch `url` and re-host the payload under `key`.
    ///
    /// Without an explicit content type the response's `Content-Type` is kept.
    pub async fn download_and_upload(
        &self,
        url: &str,
        key: &str,
        bucket: Option<&str>,
        content_type: Option<&str>,
        disposition: ContentDisposition,
    ) -> Result<StoredObject, StorageError> {
        let response = self.http.get(url).send().await.map_err(|e| {
            tracing::error!("Download of {} failed: {:?}", url, e);
            StorageError::Fetch {
                status: None,
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Fetch {
                status: Some(status.as_u16()),
                message: format!("HTTP error! status: {}", status.as_u16()),
            });
        }

        if let Some(length) = response.content_length() {
            if length > self.max_download_bytes {
                return Err(self.too_large());
            }
        }

        let response_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut buffer = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| StorageError::Fetch {
                status: Some(status.as_u16()),
                message: e.to_string(),
            })?;
            if (buffer.len() + chunk.len()) as u64 > self.max_download_bytes {
                return Err(self.too_large());
            }
            buffer.extend_from_slice(&chunk);
        }

        if buffer.is_empty() {
            return Err(StorageError::Fetch {
                status: Some(status.as_u16()),
                message: "No body in response".to_string(),
            });
        }

        self.upload_file(
            buffer.freeze(),
            key,
            UploadOptions {
                content_type: content_type.or(response_type.as_deref()),
                bucket,
                disposition,
                on_progress: None,
            },
        )
        .await
    }

    fn too_large(&self) -> StorageError {
        StorageError::Fetch {
            status: None,
            message: format!(
                "Remote payload exceeds the {} byte download limit",
                self.max_download_bytes
            ),
        }
    }
}
