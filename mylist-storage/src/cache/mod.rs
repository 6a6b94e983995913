//! Advisory cache layer for list reads.
//!
//! Two logical caches share one [`CacheBackend`]:
//!
//! - [`VersionCache`]: a per-user counter. Every mutation bumps it, and every
//!   page key embeds it, so a bump orphans all pages computed before it.
//! - [`PageCache`]: write-once storage of computed [`ListPage`]s with a TTL.
//!
//! Neither wrapper ever returns an error. Backend failures and timeouts are
//! logged, reported to the [`CacheObserver`] and turned into a miss or a
//! no-op, so list operations stay correct with the cache down.
//!
//! [`ListPage`]: mylist_core::ListPage

pub mod keys;
pub mod lmdb_backend;
pub mod memory_backend;
pub mod observer;
pub mod page;
pub mod traits;
pub mod version;

pub use keys::{version_key, PageKey};
pub use lmdb_backend::{LmdbCacheBackend, LmdbCacheError};
pub use memory_backend::InMemoryCacheBackend;
pub use observer::{CacheKind, CacheObserver, CacheOutcome, NoopObserver};
pub use page::PageCache;
pub use traits::{CacheBackend, CacheStats};
pub use version::VersionCache;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mylist_core::{CacheError, MyListConfig};

/// Run a backend call with a deadline, mapping expiry to [`CacheError::Timeout`].
pub(crate) async fn with_timeout<T, F>(
    timeout: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T, CacheError>
where
    F: Future<Output = Result<T, CacheError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(CacheError::Timeout {
            operation: operation.to_string(),
            after_ms: timeout.as_millis() as u64,
        }),
    }
}

pub(crate) fn failure_outcome(err: &CacheError) -> CacheOutcome {
    match err {
        CacheError::Timeout { .. } => CacheOutcome::Timeout,
        _ => CacheOutcome::Error,
    }
}

/// The version and page caches over one backend.
#[derive(Clone)]
pub struct ListCache {
    pub versions: VersionCache,
    pub pages: PageCache,
    backend: Arc<dyn CacheBackend>,
}

impl ListCache {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        config: &MyListConfig,
        observer: Arc<dyn CacheObserver>,
    ) -> Self {
        Self {
            versions: VersionCache::new(
                backend.clone(),
                config.version_ttl(),
                config.cache_timeout(),
                observer.clone(),
            ),
            pages: PageCache::new(
                backend.clone(),
                config.cache_ttl(),
                config.cache_timeout(),
                observer,
            ),
            backend,
        }
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }
}

impl std::fmt::Debug for ListCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListCache")
            .field("backend", &self.backend.name())
            .finish()
    }
}
