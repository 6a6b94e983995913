//! Constants for the MyList API
//!
//! Centralizing defaults makes them easy to find and to test against.

// ============================================================================
// SERVER
// ============================================================================

pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

pub const DEFAULT_PORT: u16 = 3000;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

// ============================================================================
// CORS
// ============================================================================

/// Default CORS max age in seconds (24 hours)
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86400;

// ============================================================================
// CACHE
// ============================================================================

pub const DEFAULT_LMDB_PATH: &str = "./data/mylist-cache";

/// Default LMDB map size in megabytes
pub const DEFAULT_LMDB_MAP_SIZE_MB: usize = 256;

/// How often expired cache entries are purged
pub const DEFAULT_CACHE_SWEEP_INTERVAL_SECS: u64 = 300;

// ============================================================================
// DATABASE
// ============================================================================

pub const DEFAULT_DB_POOL_SIZE: usize = 16;

pub const DEFAULT_DB_TIMEOUT_SECS: u64 = 30;

/// SQLSTATE for unique_violation
pub const UNIQUE_VIOLATION: &str = "23505";
