//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ConfigError, MyListError, MyListResult};

/// Thirty days, the refresh expiry applied to version counters on bump.
pub const DEFAULT_VERSION_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Tunables of the list service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyListConfig {
    /// TTL of cached pages.
    pub cache_ttl_seconds: u64,
    pub max_limit: u32,
    pub default_limit: u32,
    /// Expiry refreshed on a version counter each time it is bumped.
    pub version_ttl_seconds: u64,
    /// Upper bound on any single cache round trip.
    pub cache_timeout_ms: u64,
}

impl Default for MyListConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 60,
            max_limit: 100,
            default_limit: 20,
            version_ttl_seconds: DEFAULT_VERSION_TTL_SECS,
            cache_timeout_ms: 250,
        }
    }
}

impl MyListConfig {
    /// Validate the configuration.
    ///
    /// Validates:
    /// - every TTL, limit and timeout is positive
    /// - default_limit <= max_limit
    /// - cache_ttl_seconds < version_ttl_seconds
    pub fn validate(&self) -> MyListResult<()> {
        let positive: [(&str, u64); 5] = [
            ("cache_ttl_seconds", self.cache_ttl_seconds),
            ("max_limit", u64::from(self.max_limit)),
            ("default_limit", u64::from(self.default_limit)),
            ("version_ttl_seconds", self.version_ttl_seconds),
            ("cache_timeout_ms", self.cache_timeout_ms),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(invalid(field, value, "must be greater than 0"));
            }
        }

        if self.default_limit > self.max_limit {
            return Err(invalid(
                "default_limit",
                u64::from(self.default_limit),
                "must not exceed max_limit",
            ));
        }

        // A counter that expires and restarts at 0 must not revive live pages.
        if self.cache_ttl_seconds >= self.version_ttl_seconds {
            return Err(invalid(
                "cache_ttl_seconds",
                self.cache_ttl_seconds,
                "must be shorter than version_ttl_seconds",
            ));
        }

        Ok(())
    }

    /// Clamp a requested page size into `[1, max_limit]`.
    ///
    /// Absent or non-positive requests fall back to `default_limit`.
    pub fn clamp_limit(&self, requested: Option<i64>) -> u32 {
        match requested {
            Some(n) if n > 0 => n.min(i64::from(self.max_limit)) as u32,
            _ => self.default_limit.min(self.max_limit).max(1),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn version_ttl(&self) -> Duration {
        Duration::from_secs(self.version_ttl_seconds)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }
}

fn invalid(field: &str, value: u64, reason: &str) -> MyListError {
    MyListError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(MyListConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_above_max_rejected() {
        let config = MyListConfig {
            default_limit: 200,
            ..MyListConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = MyListConfig {
            cache_ttl_seconds: 0,
            ..MyListConfig::default()
        };
        match config.validate() {
            Err(MyListError::Config(ConfigError::InvalidValue { field, .. })) => {
                assert_eq!(field, "cache_ttl_seconds")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_clamp_limit() {
        let config = MyListConfig::default();
        assert_eq!(config.clamp_limit(None), 20);
        assert_eq!(config.clamp_limit(Some(0)), 20);
        assert_eq!(config.clamp_limit(Some(-5)), 20);
        assert_eq!(config.clamp_limit(Some(1)), 1);
        assert_eq!(config.clamp_limit(Some(100)), 100);
        assert_eq!(config.clamp_limit(Some(10_000)), 100);
    }
}
