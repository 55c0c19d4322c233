//! Paddock API - HTTP query surface over the telemetry cache
//!
//! Axum routers serving driver, session, season and coverage views computed
//! by `paddock-analytics`, plus health checks, Prometheus metrics and an
//! OpenAPI document.

pub mod config;
pub mod error;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use state::AppState;
