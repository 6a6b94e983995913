//! Prometheus Metrics Definitions
//!
//! Defines the MyList metrics and exposes a /metrics endpoint for scraping.
//! [`PrometheusCacheObserver`] feeds cache outcomes from the storage layer
//! into the same registry.

use axum::{http::StatusCode, response::IntoResponse};
use mylist_storage::{CacheKind, CacheObserver, CacheOutcome};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, CounterVec, Encoder,
    HistogramVec, IntCounter, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<MyListMetrics>> = Lazy::new(MyListMetrics::new);

/// Container for all MyList metrics.
#[derive(Clone)]
pub struct MyListMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Cache operation counter - labels: cache, operation, outcome
    pub cache_operations_total: CounterVec,

    /// Version bumps - labels: outcome
    pub version_bumps_total: CounterVec,

    /// Entries removed by the expired-entry sweep
    pub cache_swept_entries_total: IntCounter,
}

fn registration(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

impl MyListMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "mylist_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "mylist_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration("http_request_duration_seconds", e))?,

            cache_operations_total: register_counter_vec!(
                "mylist_cache_operations_total",
                "Cache operations by cache, operation and outcome",
                &["cache", "operation", "outcome"]
            )
            .map_err(|e| registration("cache_operations_total", e))?,

            version_bumps_total: register_counter_vec!(
                "mylist_version_bumps_total",
                "List version bumps by outcome",
                &["outcome"]
            )
            .map_err(|e| registration("version_bumps_total", e))?,

            cache_swept_entries_total: register_int_counter!(
                "mylist_cache_swept_entries_total",
                "Expired cache entries removed since startup"
            )
            .map_err(|e| registration("cache_swept_entries_total", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    pub fn record_cache_operation(
        &self,
        cache: CacheKind,
        operation: &str,
        outcome: CacheOutcome,
    ) {
        self.cache_operations_total
            .with_label_values(&[cache.as_str(), operation, outcome.as_str()])
            .inc();
        if cache == CacheKind::Version && operation == "bump" {
            self.version_bumps_total
                .with_label_values(&[outcome.as_str()])
                .inc();
        }
    }

    pub fn record_swept(&self, purged: u64) {
        self.cache_swept_entries_total.inc_by(purged);
    }
}

/// Forwards cache outcomes to [`METRICS`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusCacheObserver;

impl CacheObserver for PrometheusCacheObserver {
    fn observe(&self, cache: CacheKind, operation: &'static str, outcome: CacheOutcome) {
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_cache_operation(cache, operation, outcome);
        }
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
))]
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
