//! `aws-sdk-s3` backed object store

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::{
    presigning::PresigningConfig, primitives::ByteStream, types::Object, Client as S3Client,
};
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{ListPage, ObjectStore, ObjectSummary, PresignedUrl, StoreError, StoreResult};

/// Object store client for a single S3 bucket
pub struct S3ObjectStore {
    s3_client: Arc<S3Client>,
    bucket_name: String,
}

impl S3ObjectStore {
    /// Creates a new store over `bucket_name`
    ///
    /// # Arguments
    ///
    /// * `s3_client` - Pre-configured S3 client
    /// * `bucket_name` - Bucket holding the gallery files
    #[must_use]
    pub const fn new(s3_client: Arc<S3Client>, bucket_name: String) -> Self {
        Self {
            s3_client,
            bucket_name,
        }
    }

    /// Name of the bucket this store operates on
    #[must_use]
    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    fn summarize(object: &Object) -> Option<ObjectSummary> {
        let key = object.key()?.to_string();
        let last_modified = object
            .last_modified()
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts.secs(), ts.subsec_nanos()));

        Some(ObjectSummary { key, last_modified })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_page(&self, continuation_token: Option<String>) -> StoreResult<ListPage> {
        let response = self
            .s3_client
            .list_objects_v2()
            .bucket(&self.bucket_name)
            .set_continuation_token(continuation_token)
            .send()
            .await?;

        let objects: Vec<ObjectSummary> = response
            .contents()
            .iter()
            .filter_map(Self::summarize)
            .collect();

        debug!(
            count = objects.len(),
            truncated = response.is_truncated().unwrap_or(false),
            "listed page"
        );

        Ok(ListPage {
            objects,
            next_continuation_token: response.next_continuation_token().map(ToOwned::to_owned),
            is_truncated: response.is_truncated().unwrap_or(false),
        })
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> StoreResult<()> {
        self.s3_client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .set_content_type(content_type.map(ToOwned::to_owned))
            .body(ByteStream::from(body))
            .send()
            .await?;

        Ok(())
    }

    async fn delete_object(&self, key: &str) -> StoreResult<()> {
        self.s3_client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await?;

        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StoreResult<PresignedUrl> {
        let presigned_config = PresigningConfig::expires_in(expires_in).map_err(|e| {
            StoreError::PresignError(format!("Failed to create presigning config: {e}"))
        })?;

        let presigned_request = self
            .s3_client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .presigned(presigned_config)
            .await
            .map_err(|e| {
                StoreError::PresignError(format!("Failed to generate presigned URL: {e}"))
            })?;

        Ok(PresignedUrl {
            url: presigned_request.uri().to_string(),
            expires_at: Utc::now() + expires_in,
        })
    }
}
