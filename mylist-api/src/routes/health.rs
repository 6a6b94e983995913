//! Health Check Endpoints
//!
//! Provides Kubernetes-compatible health check endpoints:
//! - /health/ping - Simple liveness check
//! - /health/ready - Membership store and cache check
//! - /health/live - Process alive check
//!
//! The cache is advisory, so an unreachable cache degrades readiness but
//! never fails it.

use std::time::{Duration, Instant};

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::services::ListService;
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthDetails {
    pub store: ComponentHealth,
    /// Absent when caching is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<ComponentHealth>,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    fn healthy(latency_ms: u64) -> Self {
        Self {
            status: HealthStatus::Healthy,
            latency_ms: Some(latency_ms),
            error: None,
        }
    }

    fn failed(status: HealthStatus, error: String) -> Self {
        Self {
            status,
            latency_ms: None,
            error: Some(error),
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping - Simple pong response
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health/ping",
    tag = "Health",
    responses(
        (status = 200, description = "Service is responding", body = String),
    ),
))]
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/live - Process liveness check
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Process is alive", body = HealthResponse),
    ),
))]
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: None,
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/ready - Readiness check (store connectivity, cache reachability)
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready, possibly with a degraded cache", body = HealthResponse),
        (status = 503, description = "Membership store unreachable", body = HealthResponse),
    ),
))]
pub async fn readiness(
    State(service): State<ListService>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let store = check_store(&service).await;
    let cache = check_cache(&service).await;

    let overall_status = match (store.status, cache.as_ref().map(|c| c.status)) {
        (HealthStatus::Healthy, None | Some(HealthStatus::Healthy)) => HealthStatus::Healthy,
        (HealthStatus::Healthy, Some(_)) => HealthStatus::Degraded,
        _ => HealthStatus::Unhealthy,
    };

    let response = HealthResponse {
        status: overall_status,
        message: None,
        details: Some(HealthDetails {
            store,
            cache,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: start_time.elapsed().as_secs(),
        }),
    };

    let status_code = if overall_status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status_code, Json(response))
}

async fn check_store(service: &ListService) -> ComponentHealth {
    let start = Instant::now();
    match service.store().health_check().await {
        Ok(()) => ComponentHealth::healthy(start.elapsed().as_millis() as u64),
        Err(e) => {
            tracing::error!(error = %e, "Membership store health check failed");
            ComponentHealth::failed(
                HealthStatus::Unhealthy,
                format!("Store check failed: {}", e),
            )
        }
    }
}

async fn check_cache(service: &ListService) -> Option<ComponentHealth> {
    let cache = service.cache()?;
    let timeout = service.config().cache_timeout().max(Duration::from_millis(1));
    let start = Instant::now();

    let health = match tokio::time::timeout(timeout, cache.backend().stats()).await {
        Ok(Ok(_)) => ComponentHealth::healthy(start.elapsed().as_millis() as u64),
        Ok(Err(e)) => ComponentHealth::failed(
            HealthStatus::Degraded,
            format!("Cache check failed: {}", e),
        ),
        Err(_) => ComponentHealth::failed(
            HealthStatus::Degraded,
            format!("Cache check timed out after {}ms", timeout.as_millis()),
        ),
    };
    Some(health)
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create health check router (no user header required)
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}
