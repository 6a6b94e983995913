//! Per-user version counters used as cache-invalidation epochs.

use std::sync::Arc;
use std::time::Duration;

use mylist_core::{CacheError, UserId};
use tracing::{debug, warn};

use super::keys::version_key;
use super::observer::{CacheKind, CacheObserver, CacheOutcome};
use super::traits::{parse_counter, CacheBackend};
use super::{failure_outcome, with_timeout};

const INITIAL_VERSION: &[u8] = b"0";

/// Monotonic per-user counter. Only ever incremented.
#[derive(Clone)]
pub struct VersionCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
    timeout: Duration,
    observer: Arc<dyn CacheObserver>,
}

impl VersionCache {
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

    /// Current version of the user's list, creating it at 0 if absent.
    ///
    /// Concurrent first reads converge: only one `set_if_absent` succeeds and
    /// the losers read the winner's value. Returns `None` when the cache could
    /// not be consulted; callers then bypass the page cache entirely.
    pub async fn get_or_init(&self, user_id: UserId) -> Option<u64> {
        let key = version_key(user_id);
        match self.try_get_or_init(&key).await {
            Ok((version, outcome)) => {
                debug!(%user_id, version, outcome = %outcome, "resolved list version");
                self.observer
                    .observe(CacheKind::Version, "get_or_init", outcome);
                Some(version)
            }
            Err(e) => {
                warn!(%user_id, key = %key, error = %e, "version lookup failed, bypassing page cache");
                self.observer
                    .observe(CacheKind::Version, "get_or_init", failure_outcome(&e));
                None
            }
        }
    }

    async fn try_get_or_init(&self, key: &str) -> Result<(u64, CacheOutcome), CacheError> {
        if let Some(bytes) = self.get(key).await? {
            return Ok((parse_counter(key, &bytes)?, CacheOutcome::Hit));
        }

        let created = with_timeout(
            self.timeout,
            "set_if_absent",
            self.backend
                .set_if_absent(key, INITIAL_VERSION, Some(self.ttl)),
        )
        .await?;
        if created {
            return Ok((0, CacheOutcome::Miss));
        }

        // Another reader initialized it first.
        match self.get(key).await? {
            Some(bytes) => Ok((parse_counter(key, &bytes)?, CacheOutcome::Hit)),
            None => Err(CacheError::Unavailable {
                reason: "version disappeared after initialization".to_string(),
            }),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        with_timeout(self.timeout, "get", self.backend.get(key)).await
    }

    /// Advance the user's version by one and refresh its expiry.
    ///
    /// Best effort: failures are logged and reported as `None`. The expiry
    /// refresh is independent of the increment; if it fails the new version
    /// is still returned.
    pub async fn bump(&self, user_id: UserId) -> Option<u64> {
        let key = version_key(user_id);

        let version = match with_timeout(self.timeout, "incr", self.backend.incr(&key)).await {
            Ok(version) => version,
            Err(e) => {
                warn!(%user_id, key = %key, error = %e, "version bump failed");
                self.observer
                    .observe(CacheKind::Version, "bump", failure_outcome(&e));
                return None;
            }
        };
        self.observer
            .observe(CacheKind::Version, "bump", CacheOutcome::Written);

        match with_timeout(self.timeout, "expire", self.backend.expire(&key, self.ttl)).await {
            Ok(_) => self
                .observer
                .observe(CacheKind::Version, "expire", CacheOutcome::Written),
            Err(e) => {
                warn!(%user_id, key = %key, error = %e, "version expiry refresh failed");
                self.observer
                    .observe(CacheKind::Version, "expire", failure_outcome(&e));
            }
        }

        debug!(%user_id, version, "bumped list version");
        Some(version)
    }
}
