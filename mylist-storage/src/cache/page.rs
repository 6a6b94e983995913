//! Write-once cache of computed list pages.

use std::sync::Arc;
use std::time::Duration;

use mylist_core::{CacheError, ListPage};
use tracing::{debug, warn};

use super::observer::{CacheKind, CacheObserver, CacheOutcome};
use super::traits::CacheBackend;
use super::{failure_outcome, with_timeout};

/// Pages keyed by [`PageKey`](super::PageKey), stored as JSON with a TTL.
#[derive(Clone)]
pub struct PageCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
    timeout: Duration,
    observer: Arc<dyn CacheObserver>,
}

impl PageCache {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        ttl: Duration,
        timeout: Duration,
        observer: Arc<dyn CacheObserver>,
    ) -> Self {
        Self {
            backend,
            ttl,
            timeout,
            observer,
        }
    }

    /// Cached page for `key`. Unreachable or corrupt entries read as a miss.
    pub async fn get(&self, key: &str) -> Option<ListPage> {
        let result = with_timeout(self.timeout, "get", self.backend.get(key))
            .await
            .and_then(|bytes| {
                bytes
                    .map(|bytes| {
                        serde_json::from_slice::<ListPage>(&bytes).map_err(|e| {
                            CacheError::Corrupt {
                                key: key.to_string(),
                                reason: e.to_string(),
                            }
                        })
                    })
                    .transpose()
            });

        match result {
            Ok(Some(page)) => {
                debug!(key = %key, "page cache hit");
                self.observer.observe(CacheKind::Page, "get", CacheOutcome::Hit);
                Some(page)
            }
            Ok(None) => {
                debug!(key = %key, "page cache miss");
                self.observer
                    .observe(CacheKind::Page, "get", CacheOutcome::Miss);
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "page cache read failed, treating as miss");
                self.observer
                    .observe(CacheKind::Page, "get", failure_outcome(&e));
                None
            }
        }
    }

    /// Store `page` unless `key` already holds one. Returns whether it was
    /// stored; a concurrent writer that got there first keeps its page.
    pub async fn put(&self, key: &str, page: &ListPage) -> bool {
        let bytes = match serde_json::to_vec(page) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to serialize page");
                self.observer
                    .observe(CacheKind::Page, "put", CacheOutcome::Error);
                return false;
            }
        };

        let result = with_timeout(
            self.timeout,
            "set_if_absent",
            self.backend.set_if_absent(key, &bytes, Some(self.ttl)),
        )
        .await;

        match result {
            Ok(true) => {
                self.observer
                    .observe(CacheKind::Page, "put", CacheOutcome::Written);
                true
            }
            Ok(false) => {
                debug!(key = %key, "page already cached, keeping first writer");
                self.observer
                    .observe(CacheKind::Page, "put", CacheOutcome::Skipped);
                false
            }
            Err(e) => {
                warn!(key = %key, error = %e, "page cache write failed");
                self.observer
                    .observe(CacheKind::Page, "put", failure_outcome(&e));
                false
            }
        }
    }
}
