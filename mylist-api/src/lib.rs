//! MyList API - REST Layer and List Service
//!
//! Exposes the per-user watchlist over HTTP (Axum). The [`ListService`]
//! orchestrates the membership store, the content lookup and the advisory
//! version and page caches from mylist-storage. Postgres implementations of
//! the store and the lookup live in [`db`].

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod extractors;
pub mod jobs;
pub mod macros;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use config::{ApiConfig, CacheBackendKind, StoreBackendKind};
pub use db::{DbConfig, PgContentLookup, PgMembershipStore};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use extractors::{ApiJson, ApiQuery, CurrentUser};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use services::ListService;
pub use state::AppState;
pub use types::*;
