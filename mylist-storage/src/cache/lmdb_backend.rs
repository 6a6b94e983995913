//! LMDB-backed cache implementation.
//!
//! Uses the heed crate (Rust bindings for LMDB) to keep cache entries in a
//! memory-mapped file that survives restarts and can be shared by several
//! processes on one host.
//!
//! # Record Format
//!
//! `[expires_at: 8 bytes LE, unix millis, 0 = never][payload]`
//!
//! # Atomicity
//!
//! LMDB allows one write transaction at a time per environment. `incr`,
//! `set_if_absent` and `expire` read and write inside a single write
//! transaction, so they are atomic across threads and processes. Every
//! transaction runs under `spawn_blocking`; waiting for the writer lock
//! never parks a runtime worker.

use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn};
use mylist_core::CacheError;

use super::traits::{parse_counter, CacheBackend, CacheStats};

const HEADER_LEN: usize = 8;

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for CacheError {
    fn from(e: LmdbCacheError) -> Self {
        CacheError::Unavailable {
            reason: e.to_string(),
        }
    }
}

fn txn_error(e: heed::Error) -> CacheError {
    LmdbCacheError::Transaction(e.to_string()).into()
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn expiry_millis(ttl: Option<Duration>) -> i64 {
    match ttl {
        Some(ttl) => {
            let ttl = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
            now_millis().saturating_add(ttl)
        }
        None => 0,
    }
}

fn encode_record(expires_at: i64, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&expires_at.to_le_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

/// Split a stored record into (expires_at, payload).
fn decode_record<'a>(key: &str, bytes: &'a [u8]) -> Result<(i64, &'a [u8]), CacheError> {
    if bytes.len() < HEADER_LEN {
        return Err(CacheError::Corrupt {
            key: key.to_string(),
            reason: format!("record shorter than {} bytes", HEADER_LEN),
        });
    }
    let (header, payload) = bytes.split_at(HEADER_LEN);
    let mut expires_at = [0u8; HEADER_LEN];
    expires_at.copy_from_slice(header);
    Ok((i64::from_le_bytes(expires_at), payload))
}

fn is_live(expires_at: i64, now: i64) -> bool {
    expires_at == 0 || expires_at > now
}

/// LMDB-backed cache.
///
/// Transactions run on tokio's blocking pool, so a caller waiting on the
/// single LMDB writer can still be cut off by a timeout.
///
/// # Example
///
/// ```ignore
/// let backend = LmdbCacheBackend::new("/var/cache/mylist", 64)?;
/// backend.set_if_absent("k", b"v", Some(Duration::from_secs(60))).await?;
/// ```
#[derive(Clone)]
pub struct LmdbCacheBackend {
    inner: Arc<LmdbStore>,
}

/// Environment, database and counters shared with blocking tasks.
struct LmdbStore {
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    stats: RwLock<CacheStats>,
}

impl LmdbCacheBackend {
    /// Create a new LMDB cache backend.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(LmdbStore {
                env,
                db,
                stats: RwLock::new(CacheStats::default()),
            }),
        })
    }

    /// Run `op` against the store on the blocking pool.
    async fn blocking<T, F>(&self, operation: &'static str, op: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&LmdbStore) -> Result<T, CacheError> + Send + 'static,
    {
        let store = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| CacheError::Unavailable {
                reason: format!("lmdb {} task failed: {}", operation, e),
            })?
    }
}

impl LmdbStore {
    fn record(&self, f: impl FnOnce(&mut CacheStats)) {
        if let Ok(mut stats) = self.stats.write() {
            f(&mut stats);
        }
    }

    /// Live payload of `key` within an open transaction.
    fn read_live(
        &self,
        txn: &RoTxn,
        key: &str,
        now: i64,
    ) -> Result<Option<(i64, Vec<u8>)>, CacheError> {
        match self.db.get(txn, key.as_bytes()).map_err(txn_error)? {
            Some(bytes) => {
                let (expires_at, payload) = decode_record(key, bytes)?;
                Ok(is_live(expires_at, now).then(|| (expires_at, payload.to_vec())))
            }
            None => Ok(None),
        }
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let rtxn = self.env.read_txn().map_err(txn_error)?;
        match self.read_live(&rtxn, key, now_millis())? {
            Some((_, payload)) => {
                self.record(|s| s.hits += 1);
                Ok(Some(payload))
            }
            None => {
                self.record(|s| s.misses += 1);
                Ok(None)
            }
        }
    }

    fn set_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        if self.read_live(&wtxn, key, now_millis())?.is_some() {
            self.record(|s| s.skipped_writes += 1);
            return Ok(false);
        }

        let record = encode_record(expiry_millis(ttl), value);
        self.db
            .put(&mut wtxn, key.as_bytes(), &record)
            .map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)?;

        self.record(|s| s.writes += 1);
        Ok(true)
    }

    fn incr(&self, key: &str) -> Result<u64, CacheError> {
        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        let (current, expires_at) = match self.read_live(&wtxn, key, now_millis())? {
            Some((expires_at, payload)) => (parse_counter(key, &payload)?, expires_at),
            None => (0, 0),
        };
        let next = current.checked_add(1).ok_or_else(|| CacheError::Corrupt {
            key: key.to_string(),
            reason: "counter overflow".to_string(),
        })?;

        let record = encode_record(expires_at, next.to_string().as_bytes());
        self.db
            .put(&mut wtxn, key.as_bytes(), &record)
            .map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)?;

        self.record(|s| s.increments += 1);
        Ok(next)
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        let Some((_, payload)) = self.read_live(&wtxn, key, now_millis())? else {
            return Ok(false);
        };

        let record = encode_record(expiry_millis(Some(ttl)), &payload);
        self.db
            .put(&mut wtxn, key.as_bytes(), &record)
            .map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)?;
        Ok(true)
    }

    fn purge_expired(&self) -> Result<u64, CacheError> {
        let now = now_millis();
        let mut wtxn = self.env.write_txn().map_err(txn_error)?;

        let mut expired = Vec::new();
        for result in self.db.iter(&wtxn).map_err(txn_error)? {
            let (key, bytes) = result.map_err(txn_error)?;
            let live = decode_record("", bytes).map_or(false, |(at, _)| is_live(at, now));
            if !live {
                expired.push(key.to_vec());
            }
        }

        let mut purged = 0u64;
        for key in &expired {
            if self.db.delete(&mut wtxn, key).map_err(txn_error)? {
                purged += 1;
            }
        }
        wtxn.commit().map_err(txn_error)?;

        self.record(|s| s.purged += purged);
        Ok(purged)
    }

    fn stats(&self) -> Result<CacheStats, CacheError> {
        let rtxn = self.env.read_txn().map_err(txn_error)?;
        let entry_count = self.db.len(&rtxn).map_err(txn_error)?;
        let stats = self.stats.read().map(|s| s.clone()).unwrap_or_default();
        Ok(CacheStats {
            entry_count,
            ..stats
        })
    }
}

#[async_trait]
impl CacheBackend for LmdbCacheBackend {
    fn name(&self) -> &'static str {
        "lmdb"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let key = key.to_string();
        self.blocking("get", move |store| store.get(&key)).await
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        let key = key.to_string();
        let value = value.to_vec();
        self.blocking("set_if_absent", move |store| {
            store.set_if_absent(&key, &value, ttl)
        })
        .await
    }

    async fn incr(&self, key: &str) -> Result<u64, CacheError> {
        let key = key.to_string();
        self.blocking("incr", move |store| store.incr(&key)).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let key = key.to_string();
        self.blocking("expire", move |store| store.expire(&key, ttl)).await
    }

    async fn purge_expired(&self) -> Result<u64, CacheError> {
        self.blocking("purge_expired", |store| store.purge_expired()).await
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        self.blocking("stats", |store| store.stats()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_backend() -> (LmdbCacheBackend, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let backend =
            LmdbCacheBackend::new(temp_dir.path(), 10).expect("backend creation should succeed");
        (backend, temp_dir)
    }

    #[tokio::test]
    async fn test_set_if_absent_and_get() {
        let (backend, _temp_dir) = create_test_backend();

        assert!(backend
            .set_if_absent("page", b"{\"items\":[]}", Some(Duration::from_secs(60)))
            .await
            .expect("set should succeed"));
        assert!(!backend
            .set_if_absent("page", b"other", Some(Duration::from_secs(60)))
            .await
            .expect("set should succeed"));

        let value = backend.get("page").await.expect("get should succeed");
        assert_eq!(value.as_deref(), Some(&b"{\"items\":[]}"[..]));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let (backend, _temp_dir) = create_test_backend();
        assert!(backend.get("nothing").await.expect("get should succeed").is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent() {
        let (backend, _temp_dir) = create_test_backend();
        backend
            .set_if_absent("k", b"v", Some(Duration::from_millis(20)))
            .await
            .expect("set should succeed");
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(backend.get("k").await.expect("get should succeed").is_none());
        assert!(backend
            .set_if_absent("k", b"w", None)
            .await
            .expect("set should succeed"));
    }

    #[tokio::test]
    async fn test_incr_and_expire() {
        let (backend, _temp_dir) = create_test_backend();
        assert_eq!(backend.incr("v").await.expect("incr should succeed"), 1);
        assert_eq!(backend.incr("v").await.expect("incr should succeed"), 2);
        assert!(backend
            .expire("v", Duration::from_secs(3600))
            .await
            .expect("expire should succeed"));
        assert_eq!(backend.incr("v").await.expect("incr should succeed"), 3);
        assert_eq!(
            backend.get("v").await.expect("get should succeed"),
            Some(b"3".to_vec())
        );
        assert!(!backend
            .expire("absent", Duration::from_secs(1))
            .await
            .expect("expire should succeed"));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (backend, _temp_dir) = create_test_backend();
        backend
            .set_if_absent("short", b"v", Some(Duration::from_millis(10)))
            .await
            .expect("set should succeed");
        backend
            .set_if_absent("long", b"v", None)
            .await
            .expect("set should succeed");
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(backend.purge_expired().await.expect("purge should succeed"), 1);
        let stats = backend.stats().await.expect("stats should succeed");
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.purged, 1);
        assert_eq!(stats.writes, 2);
    }

    #[tokio::test]
    async fn test_reopen_keeps_entries() {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        {
            let backend = LmdbCacheBackend::new(temp_dir.path(), 10).expect("open");
            backend.incr("v").await.expect("incr should succeed");
        }
        let backend = LmdbCacheBackend::new(temp_dir.path(), 10).expect("reopen");
        assert_eq!(
            backend.get("v").await.expect("get should succeed"),
            Some(b"1".to_vec())
        );
    }

    #[tokio::test]
    async fn test_held_writer_does_not_block_timeout() {
        let (backend, _temp_dir) = create_test_backend();
        let store = Arc::clone(&backend.inner);
        let (locked_tx, locked_rx) = std::sync::mpsc::channel();
        let holder = std::thread::spawn(move || {
            let wtxn = store.env.write_txn().expect("write txn should open");
            locked_tx.send(()).expect("send should succeed");
            std::thread::sleep(Duration::from_millis(400));
            drop(wtxn);
        });
        locked_rx.recv().expect("holder should take the lock");

        let waited = tokio::time::timeout(Duration::from_millis(50), backend.incr("v")).await;
        assert!(waited.is_err(), "incr should still be waiting for the writer");

        holder.join().expect("holder thread should finish");
        assert_eq!(backend.incr("other").await.expect("incr should succeed"), 1);
    }
}
