//! OpenAPI Specification for the Paddock API
//!
//! Generated with utoipa from the route annotations and the response types.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{ComponentHealth, HealthDetails, HealthResponse, HealthStatus};
use crate::routes::{coverage, drivers, health, season, sessions};
use crate::telemetry::metrics;

use paddock_analytics::{
    ClassificationEntry, DataCoverage, DriverDetail, DriverPositionEntry, DriverPositions,
    DriverSessionResult, FastestLap, LeaderboardEntry, PerformanceSummary, SeasonSummary,
    SessionCoverage, SessionDetail, TopSpeed,
};
use paddock_core::{Driver, DriverNumber, Lap, Position, Session, SessionKey, Table};

/// OpenAPI document for the Paddock API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Paddock API",
        version = "0.1.0",
        description = "Read-only queries over a cached season of OpenF1 timing data",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Drivers", description = "Driver listings, career summaries and position history"),
        (name = "Sessions", description = "Race sessions and their classifications"),
        (name = "Season", description = "Season-wide leaderboards"),
        (name = "Coverage", description = "Cached row counts per session"),
        (name = "Health", description = "Liveness and readiness checks"),
        (name = "Observability", description = "Prometheus metrics"),
    ),
    paths(
        drivers::list_drivers,
        drivers::get_driver,
        drivers::get_driver_positions,
        sessions::list_sessions,
        sessions::get_session,
        season::season_summary,
        coverage::data_coverage,
        health::ping,
        health::liveness,
        health::readiness,
        metrics::metrics_handler,
    ),
    components(
        schemas(
            ApiError,
            ErrorCode,
            Driver,
            DriverNumber,
            Session,
            SessionKey,
            Position,
            Lap,
            Table,
            DriverDetail,
            DriverSessionResult,
            PerformanceSummary,
            DriverPositions,
            DriverPositionEntry,
            SessionDetail,
            ClassificationEntry,
            FastestLap,
            TopSpeed,
            SeasonSummary,
            LeaderboardEntry,
            DataCoverage,
            SessionCoverage,
            HealthResponse,
            HealthStatus,
            HealthDetails,
            ComponentHealth,
        )
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() -> Result<(), String> {
        let openapi = ApiDoc::openapi();

        assert_eq!(openapi.info.title, "Paddock API");

        let tags = openapi
            .tags
            .as_ref()
            .ok_or_else(|| "OpenAPI tags missing".to_string())?;
        assert_eq!(tags.len(), 6);

        let components = openapi
            .components
            .as_ref()
            .ok_or_else(|| "OpenAPI components missing".to_string())?;
        assert!(components.schemas.contains_key("DriverDetail"));
        assert!(components.schemas.contains_key("SeasonSummary"));
        Ok(())
    }

    #[test]
    fn test_openapi_json_serialization() -> Result<(), String> {
        let json = ApiDoc::to_json().map_err(|e| format!("Failed to serialize OpenAPI: {}", e))?;

        serde_json::from_str::<serde_json::Value>(&json)
            .map_err(|e| format!("Generated JSON invalid: {}", e))?;
        assert!(json.contains("Paddock API"));
        Ok(())
    }

    #[test]
    fn test_openapi_paths_exist() {
        let paths = ApiDoc::openapi().paths.paths;

        for path in [
            "/api/v1/drivers",
            "/api/v1/drivers/{id}",
            "/api/v1/drivers/{id}/positions",
            "/api/v1/sessions",
            "/api/v1/sessions/{key}",
            "/api/v1/season/summary",
            "/api/v1/coverage",
            "/health/ready",
            "/metrics",
        ] {
            assert!(paths.contains_key(path), "missing path {}", path);
        }
    }
}
