//! Expired Cache Entry Sweep
//!
//! Version bumps orphan cached pages instead of deleting them. Expired
//! entries already behave as absent, but a backend only reclaims their
//! space when `purge_expired` runs. This task runs it on an interval.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mylist_storage::CacheBackend;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::ApiConfig;
use crate::constants::DEFAULT_CACHE_SWEEP_INTERVAL_SECS;
use crate::telemetry::METRICS;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct CacheSweepConfig {
    /// How often to purge (default: 300 seconds)
    pub interval: Duration,
}

impl Default for CacheSweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_CACHE_SWEEP_INTERVAL_SECS),
        }
    }
}

impl From<&ApiConfig> for CacheSweepConfig {
    fn from(config: &ApiConfig) -> Self {
        Self {
            interval: config.sweep_interval,
        }
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters for the lifetime of one sweep task.
#[derive(Debug, Default)]
pub struct CacheSweepMetrics {
    /// Completed sweeps
    pub sweeps: AtomicU64,

    /// Entries removed across all sweeps
    pub purged: AtomicU64,

    /// Sweeps that failed
    pub errors: AtomicU64,
}

impl CacheSweepMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CacheSweepSnapshot {
        CacheSweepSnapshot {
            sweeps: self.sweeps.load(Ordering::Relaxed),
            purged: self.purged.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSweepSnapshot {
    pub sweeps: u64,
    pub purged: u64,
    pub errors: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Purge expired entries every `config.interval` until `shutdown_rx` turns
/// true. The first sweep runs immediately.
///
/// Returns the task's metrics.
pub async fn cache_sweep_task(
    backend: Arc<dyn CacheBackend>,
    config: CacheSweepConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<CacheSweepMetrics> {
    let metrics = Arc::new(CacheSweepMetrics::new());

    let mut sweep_interval = interval(config.interval);
    sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        backend = backend.name(),
        interval_secs = config.interval.as_secs(),
        "Cache sweep task started"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("Cache sweep task shutting down");
                    break;
                }
            }

            _ = sweep_interval.tick() => {
                sweep(backend.as_ref(), &metrics).await;
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        sweeps = snapshot.sweeps,
        purged = snapshot.purged,
        errors = snapshot.errors,
        "Cache sweep task completed"
    );

    metrics
}

async fn sweep(backend: &dyn CacheBackend, metrics: &CacheSweepMetrics) {
    match backend.purge_expired().await {
        Ok(purged) => {
            metrics.sweeps.fetch_add(1, Ordering::Relaxed);
            metrics.purged.fetch_add(purged, Ordering::Relaxed);
            if let Ok(m) = METRICS.as_ref() {
                m.record_swept(purged);
            }
            if purged > 0 {
                tracing::debug!(purged, "Purged expired cache entries");
            } else {
                tracing::trace!("Cache sweep found nothing to purge");
            }
        }
        Err(e) => {
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(error = %e, backend = backend.name(), "Cache sweep failed");
        }
    }
}
