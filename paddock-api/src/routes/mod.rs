//! REST API Routes Module
//!
//! Read-only query routes over the populated cache, organized by resource:
//! - Drivers, sessions, season summary and cache coverage under /api/v1/*
//! - Health check endpoints (Kubernetes-compatible)
//! - Prometheus metrics and the OpenAPI document
//! - CORS support for browser-based clients

pub mod coverage;
pub mod drivers;
pub mod health;
pub mod season;
pub mod sessions;

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    map_response_body::MapResponseBodyLayer,
    trace::TraceLayer,
};

use crate::config::ApiConfig;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub use coverage::create_router as coverage_router;
pub use drivers::create_router as drivers_router;
pub use health::create_router as health_router;
pub use season::create_router as season_router;
pub use sessions::create_router as sessions_router;

// ============================================================================
// OPENAPI ENDPOINTS
// ============================================================================

/// Handler for /openapi.json endpoint.
#[cfg(feature = "openapi")]
async fn openapi_json() -> impl axum::response::IntoResponse {
    use utoipa::OpenApi;

    axum::Json(crate::openapi::ApiDoc::openapi())
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// Empty origins allow any origin. The API is read-only, so only GET and
/// preflight requests are allowed.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!("CORS: allowing origins: {:?}", config.cors_origins);
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

// ============================================================================
// ROUTER
// ============================================================================

fn build_api_routes(state: &AppState) -> Router {
    Router::new()
        .nest("/drivers", drivers::create_router(state.clone()))
        .nest("/sessions", sessions::create_router(state.clone()))
        .nest("/season", season::create_router(state.clone()))
        .nest("/coverage", coverage::create_router(state.clone()))
}

/// Create the complete API router.
///
/// - Query routes under /api/v1/*
/// - Health checks at /health/*
/// - Metrics at /metrics
/// - OpenAPI spec at /openapi.json (when the openapi feature is enabled)
/// - Swagger UI at /swagger-ui (when the swagger-ui feature is enabled)
///
/// # Middleware Order (outer to inner)
/// 1. CORS - handles preflight requests
/// 2. HTTP trace spans from tower-http
/// 3. Observability - request metrics and completion log
pub fn create_api_router(state: AppState, api_config: &ApiConfig) -> Router {
    let mut router = Router::new()
        .nest("/api/v1", build_api_routes(&state))
        .nest("/health", health::create_router(state))
        .route("/metrics", get(metrics_handler));

    #[cfg(feature = "openapi")]
    {
        router = router.route("/openapi.json", get(openapi_json));
    }

    #[cfg(feature = "swagger-ui")]
    {
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        router = router.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", crate::openapi::ApiDoc::openapi()),
        );
    }

    router.layer(
        ServiceBuilder::new()
            .layer(build_cors_layer(api_config))
            .layer(MapResponseBodyLayer::new(axum::body::Body::new))
            .layer(TraceLayer::new_for_http())
            .layer(from_fn(observability_middleware)),
    )
}
