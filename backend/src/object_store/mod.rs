//! Object store abstraction over an S3-compatible bucket
mod error;
#[cfg(feature = "test-utils")]
mod memory;
mod s3;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use error::{StoreError, StoreResult};
#[cfg(feature = "test-utils")]
pub use memory::{InMemoryObjectStore, StoreOperation};
pub use s3::S3ObjectStore;

/// An object as reported by a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Object key, unique within the bucket
    pub key: String,
    /// Set by the store on write, absent if the store does not report it
    pub last_modified: Option<DateTime<Utc>>,
}

/// One page of a paginated listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Objects in store enumeration order
    pub objects: Vec<ObjectSummary>,
    /// Cursor for the next page, present when the listing is truncated
    pub next_continuation_token: Option<String>,
    /// Whether more pages remain
    pub is_truncated: bool,
}

/// Presigned URL with expiration information
#[derive(Debug, Clone)]
pub struct PresignedUrl {
    /// The presigned URL for GET operations
    pub url: String,
    /// UTC timestamp when the URL expires
    pub expires_at: DateTime<Utc>,
}

/// Key-addressed blob storage with paginated listing and URL presigning.
///
/// Implementations are shared by every request handler, so they must be
/// safe for concurrent use.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetches one listing page, starting at `continuation_token` if given
    async fn list_page(&self, continuation_token: Option<String>) -> StoreResult<ListPage>;

    /// Writes `body` under `key`, replacing any existing object
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> StoreResult<()>;

    /// Removes the object under `key`; removing a missing key is not an error
    async fn delete_object(&self, key: &str) -> StoreResult<()>;

    /// Mints a read URL for `key` valid for `expires_in`
    async fn presign_get(&self, key: &str, expires_in: Duration) -> StoreResult<PresignedUrl>;
}
