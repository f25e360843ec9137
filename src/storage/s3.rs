use crate::storage::traits::{StorageBackend, StorageError, StorageResult};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;

/// S3 object storage
///
/// `PutObject` replaces an object atomically, so no temp-key dance is
/// needed here.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Storage {
    /// Builds a client from the ambient AWS environment (env vars, profile,
    /// instance metadata)
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::with_client(aws_sdk_s3::Client::new(&sdk_config), bucket)
    }

    pub fn with_client(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl StorageBackend for S3Storage {
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => {
                let data = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| StorageError::ObjectStore(e.to_string()))?
                    .into_bytes();
                Ok(data.to_vec())
            }
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    Err(StorageError::NotFound(format!("s3://{}/{}", self.bucket, key)))
                } else {
                    Err(StorageError::ObjectStore(service_error.to_string()))
                }
            }
        }
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(bytes.to_vec()))
            .send()
            .await
            .map_err(|e| StorageError::ObjectStore(e.to_string()))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::ObjectStore(service_error.to_string()))
                }
            }
        }
    }

    fn describe(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}
