//! Hook for reporting cache outcomes to a metrics sink.

use std::fmt;

/// Which logical cache an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Version,
    Page,
}

impl CacheKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::Version => "version",
            CacheKind::Page => "page",
        }
    }
}

/// Result of a single cache operation as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOutcome {
    Hit,
    Miss,
    /// A write-once set stored its value.
    Written,
    /// A write-once set found the key already taken.
    Skipped,
    Error,
    Timeout,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Miss => "miss",
            CacheOutcome::Written => "written",
            CacheOutcome::Skipped => "skipped",
            CacheOutcome::Error => "error",
            CacheOutcome::Timeout => "timeout",
        }
    }
}

impl fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives one call per cache operation.
pub trait CacheObserver: Send + Sync {
    fn observe(&self, cache: CacheKind, operation: &'static str, outcome: CacheOutcome);
}

/// Observer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl CacheObserver for NoopObserver {
    fn observe(&self, _cache: CacheKind, _operation: &'static str, _outcome: CacheOutcome) {}
}
