//! Axum Middleware for HTTP Request Tracing and Metrics
//!
//! Wraps every request in a tracing span and records Prometheus metrics
//! against the matched route template, so ids never become label values.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info_span, Instrument};

use super::metrics::METRICS;

/// Label for requests that matched no route.
const UNMATCHED_ROUTE: &str = "unmatched";

/// Route template of a request, e.g. `/api/v1/mylist/:content_id`.
fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}

/// Observability middleware for Axum.
///
/// Must be added with `Router::layer` so routing has already run.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let route = route_label(&request);

    let span = info_span!(
        "http_request",
        http.method = %method,
        http.route = %route,
    );

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    let status = response.status();

    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_http_request(
            method.as_str(),
            &route,
            status.as_u16(),
            duration.as_secs_f64(),
        );
    }

    tracing::info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware::from_fn, routing::delete, Router};
    use tower::ServiceExt;

    async fn label_for(uri: &str) -> String {
        let router = Router::new()
            .route(
                "/api/v1/mylist/:content_id",
                delete(|request: Request| async move { route_label(&request) }),
            )
            .layer(from_fn(observability_middleware));
        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .method("DELETE")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_route_label_is_template() {
        assert_eq!(
            label_for("/api/v1/mylist/550e8400-e29b-41d4-a716-446655440000").await,
            "/api/v1/mylist/:content_id"
        );
        assert_eq!(
            label_for("/api/v1/mylist/not-a-uuid").await,
            "/api/v1/mylist/:content_id"
        );
    }

    #[test]
    fn test_unmatched_request_label() {
        let request = axum::http::Request::builder()
            .uri("/nowhere/42")
            .body(Body::empty())
            .unwrap();
        assert_eq!(route_label(&request), UNMATCHED_ROUTE);
    }
}
