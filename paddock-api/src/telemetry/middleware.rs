//! Axum Middleware for HTTP Request Tracing and Metrics
//!
//! Wraps every request in a tracing span and records Prometheus metrics
//! labelled with a low-cardinality route.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Instant;
use tracing::{info_span, Instrument};

use super::metrics::METRICS;

/// Numeric path segment.
static ID_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"/\d+(/|$)").ok());

/// Normalize a raw path for metric labels by replacing numeric segments
/// with `{id}`.
pub fn normalize_path(path: &str) -> String {
    match ID_PATTERN.as_ref() {
        Some(pattern) => pattern.replace_all(path, "/{id}$1").into_owned(),
        None => path.to_string(),
    }
}

/// Observability middleware for Axum.
///
/// Uses the matched route template as the metric label when routing
/// succeeded, otherwise the normalized raw path.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| normalize_path(&path));

    let span = info_span!(
        "http_request",
        http.method = %method,
        http.target = %path,
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

    #[test]
    fn test_normalize_path_numeric_id() {
        assert_eq!(normalize_path("/api/v1/sessions/9472"), "/api/v1/sessions/{id}");
    }

    #[test]
    fn test_normalize_path_nested() {
        assert_eq!(
            normalize_path("/api/v1/drivers/44/positions"),
            "/api/v1/drivers/{id}/positions"
        );
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/v1/season/summary"), "/api/v1/season/summary");
        assert_eq!(normalize_path("/health/ready"), "/health/ready");
    }
}
