//! API Configuration Module
//!
//! Server, CORS, backend selection and list-service tunables. Everything is
//! loaded from `MYLIST_*` environment variables with development defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use mylist_core::MyListConfig;

use crate::constants::{
    DEFAULT_BIND_HOST, DEFAULT_CACHE_SWEEP_INTERVAL_SECS, DEFAULT_CORS_MAX_AGE_SECS,
    DEFAULT_LMDB_MAP_SIZE_MB, DEFAULT_LMDB_PATH, DEFAULT_PORT,
};
use crate::error::{ApiError, ApiResult};

// ============================================================================
// BACKEND SELECTION
// ============================================================================

/// Which cache backend serves the version and page caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackendKind {
    #[default]
    Memory,
    Lmdb,
    /// Every list read goes to the store.
    Disabled,
}

impl FromStr for CacheBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheBackendKind::Memory),
            "lmdb" => Ok(CacheBackendKind::Lmdb),
            "disabled" | "none" | "off" => Ok(CacheBackendKind::Disabled),
            other => Err(format!("unknown cache backend: {}", other)),
        }
    }
}

/// Where memberships and the content catalog live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackendKind {
    #[default]
    Memory,
    Postgres,
}

impl FromStr for StoreBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackendKind::Memory),
            "postgres" | "postgresql" => Ok(StoreBackendKind::Postgres),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_host: String,
    pub port: u16,

    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Backends
    // ========================================================================
    pub cache_backend: CacheBackendKind,
    pub lmdb_path: PathBuf,
    pub lmdb_map_size_mb: usize,
    /// Interval of the expired-entry sweep.
    pub sweep_interval: Duration,
    pub store_backend: StoreBackendKind,
    /// JSON catalog fixture seeding the in-memory content lookup.
    pub catalog_path: Option<PathBuf>,

    pub mylist: MyListConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_BIND_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origins: Vec::new(),
            cors_max_age_secs: DEFAULT_CORS_MAX_AGE_SECS,
            cache_backend: CacheBackendKind::default(),
            lmdb_path: PathBuf::from(DEFAULT_LMDB_PATH),
            lmdb_map_size_mb: DEFAULT_LMDB_MAP_SIZE_MB,
            sweep_interval: Duration::from_secs(DEFAULT_CACHE_SWEEP_INTERVAL_SECS),
            store_backend: StoreBackendKind::default(),
            catalog_path: None,
            mylist: MyListConfig::default(),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `MYLIST_API_BIND`: Bind host (default: 0.0.0.0)
    /// - `PORT` or `MYLIST_API_PORT`: Bind port (default: 3000)
    /// - `MYLIST_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `MYLIST_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `MYLIST_CACHE_BACKEND`: memory | lmdb | disabled (default: memory)
    /// - `MYLIST_LMDB_PATH`, `MYLIST_LMDB_MAP_SIZE_MB`
    /// - `MYLIST_CACHE_SWEEP_INTERVAL_SECS` (default: 300)
    /// - `MYLIST_STORE_BACKEND`: memory | postgres (default: memory)
    /// - `MYLIST_CATALOG_PATH`: catalog fixture for the in-memory lookup
    /// - `MYLIST_CACHE_TTL_SECONDS`, `MYLIST_MAX_LIMIT`, `MYLIST_DEFAULT_LIMIT`,
    ///   `MYLIST_VERSION_TTL_SECONDS`, `MYLIST_CACHE_TIMEOUT_MS`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let default_list = MyListConfig::default();

        let cors_origins = std::env::var("MYLIST_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let port = env_parse("PORT")
            .or_else(|| env_parse("MYLIST_API_PORT"))
            .unwrap_or(defaults.port);

        let mylist = MyListConfig {
            cache_ttl_seconds: env_parse("MYLIST_CACHE_TTL_SECONDS")
                .unwrap_or(default_list.cache_ttl_seconds),
            max_limit: env_parse("MYLIST_MAX_LIMIT").unwrap_or(default_list.max_limit),
            default_limit: env_parse("MYLIST_DEFAULT_LIMIT").unwrap_or(default_list.default_limit),
            version_ttl_seconds: env_parse("MYLIST_VERSION_TTL_SECONDS")
                .unwrap_or(default_list.version_ttl_seconds),
            cache_timeout_ms: env_parse("MYLIST_CACHE_TIMEOUT_MS")
                .unwrap_or(default_list.cache_timeout_ms),
        };

        Self {
            bind_host: std::env::var("MYLIST_API_BIND").unwrap_or(defaults.bind_host),
            port,
            cors_origins,
            cors_max_age_secs: env_parse("MYLIST_CORS_MAX_AGE_SECS")
                .unwrap_or(defaults.cors_max_age_secs),
            cache_backend: env_parse("MYLIST_CACHE_BACKEND").unwrap_or(defaults.cache_backend),
            lmdb_path: std::env::var("MYLIST_LMDB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.lmdb_path),
            lmdb_map_size_mb: env_parse("MYLIST_LMDB_MAP_SIZE_MB")
                .unwrap_or(defaults.lmdb_map_size_mb),
            sweep_interval: env_parse("MYLIST_CACHE_SWEEP_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            store_backend: env_parse("MYLIST_STORE_BACKEND").unwrap_or(defaults.store_backend),
            catalog_path: std::env::var("MYLIST_CATALOG_PATH").ok().map(PathBuf::from),
            mylist,
        }
    }

    /// Validate the list tunables and the sweep interval.
    pub fn validate(&self) -> ApiResult<()> {
        self.mylist.validate().map_err(ApiError::from)?;
        if self.sweep_interval.is_zero() {
            return Err(ApiError::internal_error(
                "MYLIST_CACHE_SWEEP_INTERVAL_SECS must be greater than 0",
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>().map_err(|e| {
            ApiError::internal_error(format!("Invalid bind address {}: {}", addr, e))
        })
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // *.example.com
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain.ends_with(&format!(".{}", pattern))
                        || origin_domain == pattern;
                }
            }
            false
        })
    }
}
