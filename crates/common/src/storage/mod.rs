//! Object storage client (S3-compatible, MinIO in development)
//!
//! Thin wrapper over the AWS SDK exposing put/get/delete plus presigned
//! download URLs. A missing object maps to the domain-level
//! [`AppError::FileNotFound`]; every other failure is a collaborator error.

use crate::config::StorageConfig;
use crate::errors::{AppError, Result};
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

/// S3-compatible blob store scoped to one bucket
#[derive(Clone)]
pub struct ObjectStore {
    client: Client,
    endpoint: String,
    bucket: String,
    presign_expiry: Duration,
}

impl ObjectStore {
    /// Build a client from static credentials pointed at the configured
    /// endpoint (path-style addressing for MinIO compatibility)
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "paperdesk",
        );

        let s3_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            presign_expiry: Duration::from_secs(config.presign_expiry_secs),
        }
    }

    /// Create the bucket if it does not exist yet
    pub async fn ensure_bucket(&self) -> Result<()> {
        if self.client.head_bucket().bucket(&self.bucket).send().await.is_ok() {
            return Ok(());
        }

        match self.client.create_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                info!(bucket = %self.bucket, "Bucket created");
                Ok(())
            }
            Err(err) => {
                warn!(bucket = %self.bucket, error = %err, "Failed to create bucket");
                Err(AppError::Storage {
                    message: format!("failed to create bucket {}: {}", self.bucket, err),
                })
            }
        }
    }

    /// Upload bytes and return the object's URL
    pub async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|err| AppError::Storage {
                message: format!("upload of {} failed: {}", path, err),
            })?;

        debug!(path, size, "Object stored");

        Ok(format!("{}/{}/{}", self.endpoint, self.bucket, path))
    }

    /// Download an object's bytes
    pub async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|err| {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    AppError::FileNotFound {
                        path: path.to_string(),
                    }
                } else {
                    AppError::Storage {
                        message: format!("download of {} failed: {}", path, service_err),
                    }
                }
            })?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|err| AppError::Storage {
                message: format!("reading {} failed: {}", path, err),
            })?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    /// Delete an object. A missing object counts as deleted.
    pub async fn delete(&self, path: &str) -> Result<bool> {
        match self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                warn!(path, error = %err, "Failed to delete object");
                Ok(false)
            }
        }
    }

    /// Presigned download URL with the configured expiry
    pub async fn presigned_url(&self, path: &str) -> Result<String> {
        let presigning =
            PresigningConfig::expires_in(self.presign_expiry).map_err(|err| AppError::Storage {
                message: format!("invalid presign expiry: {}", err),
            })?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .presigned(presigning)
            .await
            .map_err(|err| AppError::Storage {
                message: format!("presigning {} failed: {}", path, err),
            })?;

        Ok(request.uri().to_string())
    }
}
