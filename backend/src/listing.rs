//! Paginated listing of the whole bucket with per-object URL signing

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::{stream, Stream, TryStreamExt};
use tracing::debug;

use crate::object_store::{ObjectStore, ObjectSummary, StoreError, StoreResult};

/// An object together with a freshly minted read URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedObject {
    /// Object key
    pub key: String,
    /// Presigned GET URL
    pub url: String,
    /// Last modification time reported by the store
    pub last_modified: Option<DateTime<Utc>>,
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Lazily walks every listing page, yielding objects in store enumeration order.
///
/// The first page is requested without a continuation token; following pages
/// reuse the token of the previous truncated page. A truncated page without a
/// token is reported as [`StoreError::InvalidResponse`].
pub fn object_summaries(
    store: &dyn ObjectStore,
) -> impl Stream<Item = StoreResult<ObjectSummary>> + Send + '_ {
    stream::try_unfold(Cursor::Start, move |cursor| next_page(store, cursor))
        .map_ok(|objects| stream::iter(objects.into_iter().map(Ok::<_, StoreError>)))
        .try_flatten()
}

async fn next_page(
    store: &dyn ObjectStore,
    cursor: Cursor,
) -> StoreResult<Option<(Vec<ObjectSummary>, Cursor)>> {
    let continuation_token = match cursor {
        Cursor::Start => None,
        Cursor::Next(token) => Some(token),
        Cursor::Done => return Ok(None),
    };

    let page = store.list_page(continuation_token).await?;
    let next = match (page.is_truncated, page.next_continuation_token) {
        (false, _) => Cursor::Done,
        (true, Some(token)) => Cursor::Next(token),
        (true, None) => {
            return Err(StoreError::InvalidResponse(
                "truncated listing without a continuation token".to_string(),
            ))
        }
    };

    debug!(count = page.objects.len(), "fetched listing page");
    Ok(Some((page.objects, next)))
}

/// Lists every object in the bucket and signs each one for `expires_in`.
///
/// Either the complete listing is returned or the first error; partial
/// results are never handed out.
///
/// # Errors
///
/// Returns the first listing or presigning error encountered.
pub async fn list_signed_objects(
    store: &dyn ObjectStore,
    expires_in: Duration,
) -> StoreResult<Vec<SignedObject>> {
    object_summaries(store)
        .and_then(|object| sign(store, object, expires_in))
        .try_collect()
        .await
}

async fn sign(
    store: &dyn ObjectStore,
    object: ObjectSummary,
    expires_in: Duration,
) -> StoreResult<SignedObject> {
    let presigned = store.presign_get(&object.key, expires_in).await?;

    Ok(SignedObject {
        key: object.key,
        url: presigned.url,
        last_modified: object.last_modified,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::object_store::{ListPage, PresignedUrl};

    const HOUR: Duration = Duration::from_secs(3600);

    /// Serves a fixed sequence of pages chained by tokens `"t1"`, `"t2"`, ...
    struct ScriptedStore {
        pages: Vec<ListPage>,
        fail_on_page: Option<usize>,
        fail_signing: Option<&'static str>,
        list_calls: AtomicUsize,
    }

    impl ScriptedStore {
        fn new(pages: &[&[&str]]) -> Self {
            let last = pages.len().saturating_sub(1);
            let pages = pages
                .iter()
                .enumerate()
                .map(|(index, keys)| ListPage {
                    objects: keys
                        .iter()
                        .map(|key| ObjectSummary {
                            key: (*key).to_string(),
                            last_modified: None,
                        })
                        .collect(),
                    next_continuation_token: (index < last).then(|| format!("t{}", index + 1)),
                    is_truncated: index < last,
                })
                .collect();

            Self {
                pages,
                fail_on_page: None,
                fail_signing: None,
                list_calls: AtomicUsize::new(0),
            }
        }

        fn page_index(token: Option<&str>) -> usize {
            token.map_or(0, |t| t.trim_start_matches('t').parse().unwrap())
        }
    }

    #[async_trait]
    impl ObjectStore for ScriptedStore {
        async fn list_page(&self, continuation_token: Option<String>) -> StoreResult<ListPage> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let index = Self::page_index(continuation_token.as_deref());
            if self.fail_on_page == Some(index) {
                return Err(StoreError::ServiceError("list failed".to_string()));
            }
            Ok(self.pages.get(index).cloned().unwrap_or_default())
        }

        async fn put_object(&self, _: &str, _: Vec<u8>, _: Option<&str>) -> StoreResult<()> {
            unreachable!("listing never writes")
        }

        async fn delete_object(&self, _: &str) -> StoreResult<()> {
            unreachable!("listing never deletes")
        }

        async fn presign_get(&self, key: &str, expires_in: Duration) -> StoreResult<PresignedUrl> {
            if self.fail_signing == Some(key) {
                return Err(StoreError::PresignError("signing failed".to_string()));
            }
            Ok(PresignedUrl {
                url: format!("https://signed.example/{key}?ttl={}", expires_in.as_secs()),
                expires_at: Utc::now() + expires_in,
            })
        }
    }

    #[tokio::test]
    async fn test_empty_bucket_yields_nothing() {
        let store = ScriptedStore::new(&[&[]]);
        let objects = list_signed_objects(&store, HOUR).await.unwrap();
        assert!(objects.is_empty());
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_pages_are_concatenated_in_order() {
        let store = ScriptedStore::new(&[&["a", "b"], &["c"], &["d", "e"]]);
        let objects = list_signed_objects(&store, HOUR).await.unwrap();

        let keys: Vec<&str> = objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 3);

        let unique: HashSet<&str> = keys.iter().copied().collect();
        assert_eq!(unique.len(), keys.len());
    }

    #[tokio::test]
    async fn test_every_object_gets_a_one_hour_url() {
        let store = ScriptedStore::new(&[&["photo.png"], &["notes.txt"]]);
        let objects = list_signed_objects(&store, HOUR).await.unwrap();

        let urls: HashMap<&str, &str> = objects
            .iter()
            .map(|o| (o.key.as_str(), o.url.as_str()))
            .collect();
        assert_eq!(urls["photo.png"], "https://signed.example/photo.png?ttl=3600");
        assert_eq!(urls["notes.txt"], "https://signed.example/notes.txt?ttl=3600");
    }

    #[tokio::test]
    async fn test_empty_truncated_page_is_followed() {
        let store = ScriptedStore::new(&[&[], &["only"]]);
        let objects = list_signed_objects(&store, HOUR).await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key, "only");
    }

    #[tokio::test]
    async fn test_list_failure_discards_earlier_pages() {
        let mut store = ScriptedStore::new(&[&["a"], &["b"], &["c"]]);
        store.fail_on_page = Some(1);

        let err = list_signed_objects(&store, HOUR).await.unwrap_err();
        assert!(matches!(err, StoreError::ServiceError(_)));
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_signing_failure_is_reported() {
        let mut store = ScriptedStore::new(&[&["a", "b"]]);
        store.fail_signing = Some("b");

        let err = list_signed_objects(&store, HOUR).await.unwrap_err();
        assert!(matches!(err, StoreError::PresignError(_)));
    }

    #[tokio::test]
    async fn test_truncated_page_without_token_is_invalid() {
        let mut store = ScriptedStore::new(&[&["a"], &["b"]]);
        store.pages[0].next_continuation_token = None;

        let err = list_signed_objects(&store, HOUR).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_summaries_stream_is_lazy() {
        let store = ScriptedStore::new(&[&["a"], &["b"]]);
        let mut summaries = Box::pin(object_summaries(&store));

        let first = summaries.try_next().await.unwrap().unwrap();
        assert_eq!(first.key, "a");
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
    }
}
