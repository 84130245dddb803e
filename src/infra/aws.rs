use async_trait::async_trait;
use aws_config::default_provider::credentials::DefaultCredentialsChain;
use aws_credential_types::{provider::SharedCredentialsProvider, Credentials};
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::{config::Region, Client, Config as S3Config};
use bytes::Bytes;
use std::time::Duration;

use crate::domain::{
    storage::{ObjectStore, ProgressCallback, PutOutput, PutRequest, StorageError, UpstreamError},
    yaml_config::ResolvedStorageConfig,
};

/// Bodies above this size go through multipart upload
pub const MULTIPART_THRESHOLD: usize = 8 * 1024 * 1024;
/// S3 requires every part but the last to be at least 5 MiB
pub const PART_SIZE: usize = 8 * 1024 * 1024;

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    endpoint: Option<String>,
    region: String,
    force_path_style: bool,
}

impl S3ObjectStore {
    pub async fn from_config(config: &ResolvedStorageConfig) -> Result<Self, StorageError> {
        let region = Region::new(config.region.clone());

        let credentials_provider: SharedCredentialsProvider =
            match (&config.access_key_id, &config.secret_access_key) {
                (Some(access_key_id), Some(secret_access_key)) => {
                    SharedCredentialsProvider::new(Credentials::new(
                        access_key_id,
                        secret_access_key,
                        None,
                        None,
                        "imagegen-server",
                    ))
                }
                _ => SharedCredentialsProvider::new(
                    DefaultCredentialsChain::builder()
                        .region(region.clone())
                        .build()
                        .await,
                ),
            };

        let mut s3_config_builder = S3Config::builder()
            .behavior_version_latest()
            .region(region)
            .credentials_provider(credentials_provider)
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(config.timeout))
                    .build(),
            );

        // R2, MinIO and other S3-compatible services
        if let Some(endpoint_url) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            region: config.region.clone(),
            force_path_style: config.force_path_style,
        })
    }

    /// Provider-native address of an object, as the SDK would report it
    pub fn object_location(&self, bucket: &str, key: &str) -> String {
        object_location(
            self.endpoint.as_deref(),
            &self.region,
            self.force_path_style,
            bucket,
            key,
        )
    }

    async fn put_single(&self, request: PutRequest<'_>) -> Result<PutOutput, StorageError> {
        self.client
            .put_object()
            .bucket(request.bucket)
            .key(request.key)
            .content_disposition(request.disposition.as_header_value())
            .set_content_type(request.content_type.map(str::to_string))
            .body(ByteStream::from(request.body))
            .send()
            .await
            .map_err(|e| upstream_error("put_object", e))?;

        if let Some(on_progress) = &request.on_progress {
            on_progress(100.0);
        }

        Ok(PutOutput {
            bucket: request.bucket.to_string(),
            key: request.key.to_string(),
            location: self.object_location(request.bucket, request.key),
        })
    }

    async fn put_multipart(&self, request: PutRequest<'_>) -> Result<PutOutput, StorageError> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(request.bucket)
            .key(request.key)
            .content_disposition(request.disposition.as_header_value())
            .set_content_type(request.content_type.map(str::to_string))
            .send()
            .await
            .map_err(|e| upstream_error("create_multipart_upload", e))?;

        let upload_id = created
            .upload_id()
            .ok_or_else(|| {
                StorageError::Upstream(UpstreamError::new(
                    None,
                    Some("create_multipart_upload returned no upload id".to_string()),
                ))
            })?
            .to_string();

        let parts = match self
            .upload_parts(
                request.bucket,
                request.key,
                &upload_id,
                &request.body,
                request.on_progress.as_ref(),
            )
            .await
        {
            Ok(parts) => parts,
            Err(e) => {
                self.abort_multipart(request.bucket, request.key, &upload_id)
                    .await;
                return Err(e);
            }
        };

        let completed = self
            .client
            .complete_multipart_upload()
            .bucket(request.bucket)
            .key(request.key)
            .upload_id(&upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await;

        let completed = match completed {
            Ok(output) => output,
            Err(e) => {
                self.abort_multipart(request.bucket, request.key, &upload_id)
                    .await;
                return Err(upstream_error("complete_multipart_upload", e));
            }
        };

        let location = completed
            .location()
            .map(str::to_string)
            .unwrap_or_else(|| self.object_location(request.bucket, request.key));

        Ok(PutOutput {
            bucket: request.bucket.to_string(),
            key: request.key.to_string(),
            location,
        })
    }

    async fn upload_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        body: &Bytes,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<CompletedPart>, StorageError> {
        let total = body.len();
        let mut parts = Vec::new();
        let mut offset = 0;
        let mut part_number: i32 = 1;

        while offset < total {
            let end = usize::min(offset + PART_SIZE, total);
            let chunk = body.slice(offset..end);

            let uploaded = self
                .client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(chunk))
                .send()
                .await
                .map_err(|e| upstream_error("upload_part", e))?;

            parts.push(
                CompletedPart::builder()
                    .set_e_tag(uploaded.e_tag().map(str::to_string))
                    .part_number(part_number)
                    .build(),
            );

            offset = end;
            part_number += 1;

            if let Some(on_progress) = on_progress {
                on_progress(offset as f64 / total as f64 * 100.0);
            }
            tracing::debug!("Uploaded part {} of {} ({} bytes)", part_number - 1, key, offset);
        }

        Ok(parts)
    }

    async fn abort_multipart(&self, bucket: &str, key: &str, upload_id: &str) {
        if let Err(e) = self
            .client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
        {
            tracing::warn!("Failed to abort multipart upload for {}: {:?}", key, e);
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, request: PutRequest<'_>) -> Result<PutOutput, StorageError> {
        if request.body.len() > MULTIPART_THRESHOLD {
            self.put_multipart(request).await
        } else {
            self.put_single(request).await
        }
    }

    /// Performs a one-key list_objects_v2 to check credentials and bucket access
    async fn test_connection(&self, bucket: &str) -> Result<(), StorageError> {
        tracing::debug!("Testing connection to bucket: {}", bucket);

        self.client
            .list_objects_v2()
            .bucket(bucket)
            .max_keys(1)
            .send()
            .await
            .map_err(|e| upstream_error("list_objects_v2", e))?;

        tracing::info!("Successfully connected to bucket: {}", bucket);
        Ok(())
    }
}

fn upstream_error<E>(operation: &str, err: SdkError<E, HttpResponse>) -> StorageError
where
    E: ProvideErrorMetadata + std::fmt::Debug,
{
    tracing::error!("S3 {} failed: {:?}", operation, err);

    let status = err.raw_response().map(|r| r.status().as_u16());
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| format!("S3 {} failed", operation));

    StorageError::Upstream(UpstreamError::new(status, Some(message)))
}

fn object_location(
    endpoint: Option<&str>,
    region: &str,
    force_path_style: bool,
    bucket: &str,
    key: &str,
) -> String {
    match endpoint.map(|e| e.trim_end_matches('/')) {
        Some(endpoint) if force_path_style => format!("{}/{}/{}", endpoint, bucket, key),
        Some(endpoint) => match endpoint.split_once("://") {
            Some((scheme, host)) => format!("{}://{}.{}/{}", scheme, bucket, host, key),
            None => format!("{}/{}/{}", endpoint, bucket, key),
        },
        None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key),
    }
}
