//! Paddock Telemetry - Observability Infrastructure
//!
//! Structured logging via `tracing-subscriber` and Prometheus metrics for
//! HTTP traffic and startup ingestion.

pub mod logging;
pub mod metrics;
pub mod middleware;

pub use logging::{init_tracing, LogConfig, LogFormat};
pub use metrics::{metrics_handler, PaddockMetrics, PrometheusObserver, METRICS};
pub use middleware::observability_middleware;
