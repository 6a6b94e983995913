//! In-process cache backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use mylist_core::CacheError;
use tokio::sync::RwLock;

use super::traits::{parse_counter, CacheBackend, CacheStats};

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    stats: CacheStats,
}

impl Inner {
    fn live(&self, key: &str, now: Instant) -> Option<&Entry> {
        self.entries.get(key).filter(|e| e.is_live(now))
    }
}

/// Cache backend over a `HashMap` behind a tokio `RwLock`.
///
/// Every mutating primitive runs under the write lock, which makes
/// `set_if_absent` and `incr` atomic across tasks of the process.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCacheBackend {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries still live.
    pub async fn live_len(&self) -> usize {
        let now = Instant::now();
        let inner = self.inner.read().await;
        inner.entries.values().filter(|e| e.is_live(now)).count()
    }

    /// Drop every entry. Statistics are kept.
    pub async fn clear(&self) {
        self.inner.write().await.entries.clear();
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        let mut inner = self.inner.write().await;
        let value = inner.live(key, now).map(|e| e.value.clone());
        match value {
            Some(_) => inner.stats.hits += 1,
            None => inner.stats.misses += 1,
        }
        Ok(value)
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        let now = Instant::now();
        let mut inner = self.inner.write().await;
        if inner.live(key, now).is_some() {
            inner.stats.skipped_writes += 1;
            return Ok(false);
        }

        inner.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: ttl.map(|ttl| now + ttl),
            },
        );
        inner.stats.writes += 1;
        Ok(true)
    }

    async fn incr(&self, key: &str) -> Result<u64, CacheError> {
        let now = Instant::now();
        let mut inner = self.inner.write().await;

        let (current, expires_at) = match inner.live(key, now) {
            Some(entry) => (parse_counter(key, &entry.value)?, entry.expires_at),
            None => (0, None),
        };
        let next = current.checked_add(1).ok_or_else(|| CacheError::Corrupt {
            key: key.to_string(),
            reason: "counter overflow".to_string(),
        })?;

        inner.entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string().into_bytes(),
                expires_at,
            },
        );
        inner.stats.increments += 1;
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let now = Instant::now();
        let mut inner = self.inner.write().await;
        match inner.entries.get_mut(key).filter(|e| e.is_live(now)) {
            Some(entry) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn purge_expired(&self) -> Result<u64, CacheError> {
        let now = Instant::now();
        let mut inner = self.inner.write().await;
        let before = inner.entries.len();
        inner.entries.retain(|_, e| e.is_live(now));
        let purged = (before - inner.entries.len()) as u64;
        inner.stats.purged += purged;
        Ok(purged)
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        let inner = self.inner.read().await;
        Ok(CacheStats {
            entry_count: inner.entries.len() as u64,
            ..inner.stats.clone()
        })
    }
}
