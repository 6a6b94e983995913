//! Error types for MyList operations

use thiserror::Error;

use crate::{ContentId, ContentType, EpisodeId, UserId};

/// Membership store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// The (user, content) pair already has a membership. Callers treat this
    /// as "item already present", not as a failure.
    #[error("Membership already exists for user {user_id} and content {content_id}")]
    Duplicate {
        user_id: UserId,
        content_id: ContentId,
    },

    #[error("Membership not found for user {user_id} and content {content_id}")]
    NotFound {
        user_id: UserId,
        content_id: ContentId,
    },

    #[error("Storage backend failure: {reason}")]
    Backend { reason: String },

    #[error("Storage operation '{operation}' timed out")]
    Timeout { operation: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Request validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid identifier for {field}: '{value}'")]
    InvalidId { field: String, value: String },

    #[error("Invalid cursor: {reason}")]
    InvalidCursor { reason: String },

    #[error("Invalid content type '{value}', expected 'movie' or 'show'")]
    InvalidContentType { value: String },

    #[error("Movies cannot reference an episode")]
    EpisodeNotAllowed,

    #[error("Invalid snapshot: {reason}")]
    InvalidSnapshot { reason: String },
}

/// Content lookup errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("User {user_id} not found")]
    UserNotFound { user_id: UserId },

    #[error("{content_type} {content_id} not found")]
    ContentNotFound {
        content_type: ContentType,
        content_id: ContentId,
    },

    #[error("Episode {episode_id} not found")]
    EpisodeNotFound { episode_id: EpisodeId },

    #[error("Episode {episode_id} does not belong to show {show_id}")]
    EpisodeShowMismatch {
        episode_id: EpisodeId,
        show_id: ContentId,
    },

    #[error("Content lookup failed: {reason}")]
    Backend { reason: String },
}

/// Cache layer errors. These never reach a caller of the list operations;
/// the cache wrappers log and swallow them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache operation '{operation}' timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    #[error("Corrupt cache entry at {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all MyList errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MyListError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for MyList operations.
pub type MyListResult<T> = Result<T, MyListError>;

// =============================================================================
// TESTS
// =============================================================================
