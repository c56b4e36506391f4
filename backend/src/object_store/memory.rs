//! In-process object store used by tests
//!
//! Listings are paginated in key order with a configurable page size, and
//! presigned URLs carry an HMAC-SHA256 signature that [`InMemoryObjectStore::fetch_presigned`]
//! verifies before handing back the stored bytes. Every operation can be made
//! to fail on demand.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::RwLock;
use url::Url;

use super::{ListPage, ObjectStore, ObjectSummary, PresignedUrl, StoreError, StoreResult};

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_ENDPOINT: &str = "http://objects.memory.local";
const DEFAULT_PAGE_SIZE: usize = 1000;
const SIGNATURE_PARAM: &str = "X-Amz-Signature";
const DATE_PARAM: &str = "X-Amz-Date";
const EXPIRES_PARAM: &str = "X-Amz-Expires";

/// Store operations that can be observed and made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// `list_page`
    List,
    /// `put_object`
    Put,
    /// `delete_object`
    Delete,
    /// `presign_get`
    Presign,
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    Service,
    Upstream,
}

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    content_type: Option<String>,
    last_modified: DateTime<Utc>,
}

/// Object store keeping everything in memory
pub struct InMemoryObjectStore {
    bucket_name: String,
    endpoint: Url,
    page_size: usize,
    signing_key: Vec<u8>,
    objects: RwLock<BTreeMap<String, StoredObject>>,
    failures: RwLock<HashMap<StoreOperation, Failure>>,
    calls: RwLock<HashMap<StoreOperation, usize>>,
}

impl InMemoryObjectStore {
    /// Creates an empty store for `bucket_name`
    ///
    /// # Panics
    ///
    /// Never in practice: the default endpoint is a valid URL
    #[must_use]
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            page_size: DEFAULT_PAGE_SIZE,
            signing_key: b"in-memory-signing-key".to_vec(),
            objects: RwLock::new(BTreeMap::new()),
            failures: RwLock::new(HashMap::new()),
            calls: RwLock::new(HashMap::new()),
        }
    }

    /// Limits every listing page to `page_size` objects
    ///
    /// # Panics
    ///
    /// Panics if `page_size` is zero
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        assert!(page_size > 0, "page size must be positive");
        self.page_size = page_size;
        self
    }

    /// Makes every subsequent call of `operation` fail with a service error
    pub async fn fail(&self, operation: StoreOperation) {
        self.failures.write().await.insert(operation, Failure::Service);
    }

    /// Makes every subsequent call of `operation` fail as a 5xx from the store
    pub async fn fail_upstream(&self, operation: StoreOperation) {
        self.failures.write().await.insert(operation, Failure::Upstream);
    }

    /// Clears an injected failure
    pub async fn recover(&self, operation: StoreOperation) {
        self.failures.write().await.remove(&operation);
    }

    /// Number of times `operation` was attempted, including failed attempts
    pub async fn call_count(&self, operation: StoreOperation) -> usize {
        self.calls
            .read()
            .await
            .get(&operation)
            .copied()
            .unwrap_or_default()
    }

    /// Keys currently stored, in key order
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    /// Stored bytes and content type for `key`
    pub async fn object(&self, key: &str) -> Option<(Vec<u8>, Option<String>)> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|object| (object.body.clone(), object.content_type.clone()))
    }

    /// Resolves a URL minted by [`ObjectStore::presign_get`] to the object bytes.
    ///
    /// Returns `None` when the signature does not verify, the URL has expired,
    /// or the object no longer exists.
    pub async fn fetch_presigned(&self, presigned_url: &str) -> Option<Vec<u8>> {
        let url = Url::parse(presigned_url).ok()?;
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let signed_at: i64 = query.get(DATE_PARAM)?.parse().ok()?;
        let expires_in: i64 = query.get(EXPIRES_PARAM)?.parse().ok()?;
        let signature = hex::decode(query.get(SIGNATURE_PARAM)?).ok()?;

        if Utc::now().timestamp() >= signed_at + expires_in {
            return None;
        }

        let objects = self.objects.read().await;
        let (key, object) = objects
            .iter()
            .find(|(key, _)| self.object_url(key).is_some_and(|u| u.path() == url.path()))?;

        let mac = self.mac(key, signed_at, expires_in).ok()?;
        mac.verify_slice(&signature).ok()?;

        Some(object.body.clone())
    }

    fn object_url(&self, key: &str) -> Option<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push(&self.bucket_name)
            .push(key);
        Some(url)
    }

    fn mac(&self, key: &str, signed_at: i64, expires_in: i64) -> StoreResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .map_err(|e| StoreError::PresignError(e.to_string()))?;
        mac.update(
            format!("GET\n{}\n{key}\n{signed_at}\n{expires_in}", self.bucket_name).as_bytes(),
        );
        Ok(mac)
    }

    async fn attempt(&self, operation: StoreOperation) -> StoreResult<()> {
        *self.calls.write().await.entry(operation).or_default() += 1;

        match (operation, self.failures.read().await.get(&operation)) {
            (_, None) => Ok(()),
            (StoreOperation::Presign, Some(_)) => Err(StoreError::PresignError(
                "injected presign failure".to_string(),
            )),
            (_, Some(Failure::Service)) => Err(StoreError::ServiceError(format!(
                "injected {operation:?} failure"
            ))),
            (_, Some(Failure::Upstream)) => Err(StoreError::UpstreamError(format!(
                "injected {operation:?} failure"
            ))),
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn list_page(&self, continuation_token: Option<String>) -> StoreResult<ListPage> {
        self.attempt(StoreOperation::List).await?;

        let objects = self.objects.read().await;
        let start = continuation_token.map_or(Bound::Unbounded, Bound::Excluded);
        let mut page: Vec<ObjectSummary> = objects
            .range((start, Bound::Unbounded))
            .take(self.page_size + 1)
            .map(|(key, object)| ObjectSummary {
                key: key.clone(),
                last_modified: Some(object.last_modified),
            })
            .collect();

        let is_truncated = page.len() > self.page_size;
        page.truncate(self.page_size);

        Ok(ListPage {
            next_continuation_token: is_truncated
                .then(|| page.last().map(|object| object.key.clone()))
                .flatten(),
            objects: page,
            is_truncated,
        })
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> StoreResult<()> {
        self.attempt(StoreOperation::Put).await?;

        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.map(ToOwned::to_owned),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> StoreResult<()> {
        self.attempt(StoreOperation::Delete).await?;

        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StoreResult<PresignedUrl> {
        self.attempt(StoreOperation::Presign).await?;

        let signed_at = Utc::now();
        let expires_secs = i64::try_from(expires_in.as_secs())
            .map_err(|e| StoreError::PresignError(format!("expiry out of range: {e}")))?;
        let signature = self
            .mac(key, signed_at.timestamp(), expires_secs)?
            .finalize()
            .into_bytes();

        let mut url = self
            .object_url(key)
            .ok_or_else(|| StoreError::PresignError("endpoint cannot be a base".to_string()))?;
        url.query_pairs_mut()
            .append_pair(DATE_PARAM, &signed_at.timestamp().to_string())
            .append_pair(EXPIRES_PARAM, &expires_secs.to_string())
            .append_pair(SIGNATURE_PARAM, &hex::encode(signature));

        Ok(PresignedUrl {
            url: url.to_string(),
            expires_at: signed_at + expires_in,
        })
    }
}
