//! Cache backend trait and statistics.

use std::time::Duration;

use async_trait::async_trait;
use mylist_core::CacheError;

/// Key-value cache with the primitives the version and page caches need.
///
/// Values are opaque bytes. Expiry is per key; an expired key behaves as
/// absent for every operation even before it is purged.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short name used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `value` only if `key` holds nothing. Returns whether it was stored.
    ///
    /// Concurrent callers on the same absent key: exactly one wins.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError>;

    /// Atomically increment a decimal counter and return the new value.
    ///
    /// An absent key counts from 0 and is created without expiry. An existing
    /// expiry is kept.
    async fn incr(&self, key: &str) -> Result<u64, CacheError>;

    /// Set the expiry of an existing key. Returns false if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError>;

    /// Physically remove expired entries. Returns how many were removed.
    async fn purge_expired(&self) -> Result<u64, CacheError>;

    async fn stats(&self) -> Result<CacheStats, CacheError>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Successful `set_if_absent` writes.
    pub writes: u64,
    /// `set_if_absent` calls that found the key already present.
    pub skipped_writes: u64,
    pub increments: u64,
    /// Entries removed by `purge_expired`.
    pub purged: u64,
    /// Entries currently stored, expired ones included until purged.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Parse a counter stored as ASCII decimal.
pub(crate) fn parse_counter(key: &str, bytes: &[u8]) -> Result<u64, CacheError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| CacheError::Corrupt {
            key: key.to_string(),
            reason: "value is not a decimal counter".to_string(),
        })
}
