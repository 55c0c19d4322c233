//! Prometheus Metrics Definitions
//!
//! HTTP request metrics recorded by the middleware, plus ingestion metrics
//! fed through [`PrometheusObserver`] during startup population.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use paddock_core::Table;
use paddock_ingest::{AttemptOutcome, IngestObserver};
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge_vec, CounterVec, Encoder,
    HistogramVec, IntGaugeVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0,
];

/// Global metrics instance - initialized on first use
pub static METRICS: Lazy<ApiResult<PaddockMetrics>> = Lazy::new(PaddockMetrics::new);

/// Container for all Paddock metrics.
#[derive(Clone)]
pub struct PaddockMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Provider fetch attempts - labels: endpoint, outcome
    pub fetch_attempts_total: CounterVec,

    /// Rows committed during population - labels: table
    pub rows_inserted_total: CounterVec,

    /// Rows currently cached - labels: table
    pub cached_rows: IntGaugeVec,
}

fn registration_error(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

impl PaddockMetrics {
    /// Create and register all metrics with the default Prometheus registry.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "paddock_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "paddock_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            fetch_attempts_total: register_counter_vec!(
                "paddock_fetch_attempts_total",
                "Telemetry provider fetch attempts",
                &["endpoint", "outcome"]
            )
            .map_err(|e| registration_error("fetch_attempts_total", e))?,

            rows_inserted_total: register_counter_vec!(
                "paddock_rows_inserted_total",
                "Rows written to the cache during population",
                &["table"]
            )
            .map_err(|e| registration_error("rows_inserted_total", e))?,

            cached_rows: register_int_gauge_vec!(
                "paddock_cached_rows",
                "Rows currently held in the cache",
                &["table"]
            )
            .map_err(|e| registration_error("cached_rows", e))?,
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

    pub fn record_fetch_attempt(&self, endpoint: &str, outcome: AttemptOutcome) {
        self.fetch_attempts_total
            .with_label_values(&[endpoint, outcome.as_str()])
            .inc();
    }

    pub fn record_rows_inserted(&self, table: Table, rows: usize) {
        self.rows_inserted_total
            .with_label_values(&[table.as_str()])
            .inc_by(rows as f64);
    }

    pub fn set_cached_rows(&self, table: Table, rows: usize) {
        self.cached_rows
            .with_label_values(&[table.as_str()])
            .set(i64::try_from(rows).unwrap_or(i64::MAX));
    }
}

/// Ingestion observer that feeds [`METRICS`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusObserver;

impl IngestObserver for PrometheusObserver {
    fn fetch_attempt(&self, endpoint: &str, outcome: AttemptOutcome) {
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_fetch_attempt(endpoint, outcome);
        }
    }

    fn rows_inserted(&self, table: Table, rows: usize) {
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_rows_inserted(table, rows);
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
