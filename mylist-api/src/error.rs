//! Error Types for the MyList API
//!
//! This module defines error handling for the HTTP layer:
//! - ApiError struct for structured error responses
//! - ErrorCode enum with one code per distinguishable failure
//! - IntoResponse implementation for Axum HTTP responses
//! - Conversion from the domain error taxonomy
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mylist_core::{
    CacheError, ConfigError, LookupError, MyListError, StorageError, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each code maps to exactly one HTTP status, and clients can rely on the
/// serialized name staying stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// An identifier is not a well-formed UUID
    InvalidId,

    /// The pagination cursor could not be decoded
    InvalidCursor,

    /// Content type is neither `movie` nor `show`
    InvalidContentType,

    /// An episode was supplied for a movie
    EpisodeNotAllowed,

    /// The supplied snapshot is unusable
    InvalidSnapshot,

    /// The request carries no user identity
    MissingUser,

    /// Body or query string could not be parsed
    InvalidRequest,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    UserNotFound,
    ContentNotFound,
    EpisodeNotFound,

    /// The user's list does not contain the content
    ItemNotFound,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    /// The episode belongs to a different show
    EpisodeShowMismatch,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    InternalError,
    DatabaseError,
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidId
            | ErrorCode::InvalidCursor
            | ErrorCode::InvalidContentType
            | ErrorCode::EpisodeNotAllowed
            | ErrorCode::InvalidSnapshot
            | ErrorCode::MissingUser
            | ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,

            ErrorCode::UserNotFound
            | ErrorCode::ContentNotFound
            | ErrorCode::EpisodeNotFound
            | ErrorCode::ItemNotFound => StatusCode::NOT_FOUND,

            ErrorCode::EpisodeShowMismatch => StatusCode::CONFLICT,

            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::InternalError | ErrorCode::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidId => "Invalid identifier",
            ErrorCode::InvalidCursor => "Invalid cursor",
            ErrorCode::InvalidContentType => "Content type must be 'movie' or 'show'",
            ErrorCode::EpisodeNotAllowed => "Movies cannot reference an episode",
            ErrorCode::InvalidSnapshot => "Invalid snapshot",
            ErrorCode::MissingUser => "Missing x-user-id header",
            ErrorCode::InvalidRequest => "Malformed request",
            ErrorCode::UserNotFound => "User not found",
            ErrorCode::ContentNotFound => "Content not found",
            ErrorCode::EpisodeNotFound => "Episode not found",
            ErrorCode::ItemNotFound => "Item is not in the list",
            ErrorCode::EpisodeShowMismatch => "Episode does not belong to the show",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database operation failed",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional structured context (offending field, ids)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors
    // ========================================================================

    pub fn invalid_id(field: &str, value: &str) -> Self {
        Self::new(
            ErrorCode::InvalidId,
            format!("Field '{}' is not a valid UUID", field),
        )
        .with_details(serde_json::json!({ "field": field, "value": value }))
    }

    pub fn missing_user() -> Self {
        Self::from_code(ErrorCode::MissingUser)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    pub fn item_not_found(content_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::ItemNotFound,
            format!("Content {} is not in the list", content_id),
        )
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Create a DatabaseError.
    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Create a ServiceUnavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidId { field, value } => ApiError::invalid_id(&field, &value),
            ValidationError::InvalidCursor { .. } => {
                ApiError::new(ErrorCode::InvalidCursor, err.to_string())
            }
            ValidationError::InvalidContentType { .. } => {
                ApiError::new(ErrorCode::InvalidContentType, err.to_string())
            }
            ValidationError::EpisodeNotAllowed => ApiError::from_code(ErrorCode::EpisodeNotAllowed),
            ValidationError::InvalidSnapshot { .. } => {
                ApiError::new(ErrorCode::InvalidSnapshot, err.to_string())
            }
        }
    }
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::UserNotFound { .. } => ApiError::new(ErrorCode::UserNotFound, err.to_string()),
            LookupError::ContentNotFound { .. } => {
                ApiError::new(ErrorCode::ContentNotFound, err.to_string())
            }
            LookupError::EpisodeNotFound { .. } => {
                ApiError::new(ErrorCode::EpisodeNotFound, err.to_string())
            }
            LookupError::EpisodeShowMismatch { .. } => {
                ApiError::new(ErrorCode::EpisodeShowMismatch, err.to_string())
            }
            LookupError::Backend { reason } => {
                tracing::error!(%reason, "Content lookup failed");
                ApiError::internal_error("Content lookup failed")
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { content_id, .. } => ApiError::item_not_found(content_id),
            StorageError::Timeout { operation } => {
                tracing::error!(%operation, "Membership store timed out");
                ApiError::service_unavailable("Membership store timed out")
            }
            StorageError::Backend { reason } => {
                // Log the full error, return a generic one
                tracing::error!(%reason, "Membership store error");
                ApiError::database_error("Database operation failed")
            }
            StorageError::Duplicate { .. } | StorageError::LockPoisoned => {
                tracing::error!(error = %err, "Unrecovered membership store error");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        tracing::error!(error = %err, "Cache error escaped the cache layer");
        ApiError::internal_error("Internal server error")
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::internal_error(err.to_string())
    }
}

impl From<MyListError> for ApiError {
    fn from(err: MyListError) -> Self {
        match err {
            MyListError::Validation(e) => e.into(),
            MyListError::Lookup(e) => e.into(),
            MyListError::Storage(e) => e.into(),
            MyListError::Cache(e) => e.into(),
            MyListError::Config(e) => e.into(),
        }
    }
}

/// Convert from tokio_postgres::Error to ApiError.
impl From<tokio_postgres::Error> for ApiError {
    fn from(err: tokio_postgres::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        ApiError::database_error("Database operation failed")
    }
}

/// Convert from deadpool_postgres::PoolError to ApiError.
impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        tracing::error!("Connection pool error: {:?}", err);
        match err {
            deadpool_postgres::PoolError::Timeout(_) => {
                ApiError::service_unavailable("Database connection pool exhausted")
            }
            deadpool_postgres::PoolError::Closed => {
                ApiError::service_unavailable("Database connection pool is closed")
            }
            _ => ApiError::database_error("Failed to acquire database connection"),
        }
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
