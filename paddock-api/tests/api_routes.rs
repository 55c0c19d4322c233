//! Router tests against the reference grid held in a memory store.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use paddock_analytics::{DataCoverage, DriverDetail, DriverPositions, SeasonSummary, SessionDetail};
use paddock_api::{create_api_router, ApiConfig, ApiError, AppState, ErrorCode};
use paddock_core::{Driver, DriverNumber, Session, SessionKey};
use paddock_storage::{AnyStore, MemoryStore};
use paddock_test_utils::fixtures;
use serde::de::DeserializeOwned;
use tower::ServiceExt;

async fn router(seeded: bool) -> Router {
    let store = MemoryStore::new();
    if seeded {
        fixtures::seed(&store, &fixtures::grid())
            .await
            .expect("seeding should succeed");
    }
    let state = AppState::new(Arc::new(AnyStore::from(store)), 2024);
    create_api_router(state, &ApiConfig::default())
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    let response = app.oneshot(request).await.expect("router should respond");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    (status, body.to_vec())
}

async fn get_json<T: DeserializeOwned>(uri: &str) -> T {
    let (status, body) = get(router(true).await, uri).await;
    assert_eq!(status, StatusCode::OK, "GET {}", uri);
    serde_json::from_slice(&body).expect("response should be valid JSON")
}

async fn get_error(uri: &str) -> (StatusCode, ApiError) {
    let (status, body) = get(router(true).await, uri).await;
    let error = serde_json::from_slice(&body).expect("error body should be valid JSON");
    (status, error)
}

// ============================================================================
// DRIVERS
// ============================================================================

#[tokio::test]
async fn test_list_drivers_sorted_by_number() {
    let drivers: Vec<Driver> = get_json("/api/v1/drivers").await;
    let numbers: Vec<u32> = drivers.iter().map(|d| d.driver_number.get()).collect();
    assert_eq!(numbers, vec![1, 4, 16, 44]);
}

#[tokio::test]
async fn test_driver_detail() {
    let detail: DriverDetail = get_json("/api/v1/drivers/1").await;
    assert_eq!(detail.full_name, "Max Verstappen");
    assert_eq!(detail.performance_summary.wins, 2);
    assert_eq!(detail.performance_summary.top_3_finishes, 3);
    assert_eq!(detail.race_results.len(), 3);
}

#[tokio::test]
async fn test_driver_not_found() {
    let (status, error) = get_error("/api/v1/drivers/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error.code, ErrorCode::EntityNotFound);
    assert!(error.message.contains("Driver"));
}

#[tokio::test]
async fn test_driver_positions() {
    let history: DriverPositions = get_json("/api/v1/drivers/1/positions").await;
    assert_eq!(history.driver_number, DriverNumber(1));
    assert_eq!(history.positions.len(), 4);
    assert!(history
        .positions
        .windows(2)
        .all(|pair| pair[0].date <= pair[1].date));
}

#[tokio::test]
async fn test_driver_positions_rejects_non_numeric_id() {
    let (status, error) = get_error("/api/v1/drivers/abc/positions").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error.code, ErrorCode::InvalidInput);
}

// ============================================================================
// SESSIONS
// ============================================================================

#[tokio::test]
async fn test_list_sessions() {
    let sessions: Vec<Session> = get_json("/api/v1/sessions").await;
    assert_eq!(sessions.len(), 3);
}

#[tokio::test]
async fn test_session_detail_includes_last_place() {
    let detail: SessionDetail = get_json("/api/v1/sessions/100").await;
    let order: Vec<u32> = detail.results.iter().map(|r| r.driver_number.get()).collect();
    assert_eq!(order, vec![1, 16, 4, 44]);
    assert!(detail.results[3].last_place);
}

#[tokio::test]
async fn test_session_key_must_be_numeric() {
    let (status, error) = get_error("/api/v1/sessions/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error.code, ErrorCode::InvalidInput);
}

#[tokio::test]
async fn test_unknown_session_is_404() {
    let (status, error) = get_error("/api/v1/sessions/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error.code, ErrorCode::EntityNotFound);
}

// ============================================================================
// SEASON AND COVERAGE
// ============================================================================

#[tokio::test]
async fn test_season_summary() {
    let summary: SeasonSummary = get_json("/api/v1/season/summary").await;
    assert_eq!(summary.season, 2024);
    assert_eq!(summary.sessions, 3);

    let winners: Vec<(u32, usize)> = summary
        .top_3_winners
        .iter()
        .map(|e| (e.driver_number.get(), e.count))
        .collect();
    assert_eq!(winners, vec![(1, 2), (16, 1)]);
}

#[tokio::test]
async fn test_coverage_complete_for_grid() {
    let coverage: DataCoverage = get_json("/api/v1/coverage").await;
    assert_eq!(coverage.drivers, 4);
    assert_eq!(coverage.sessions.len(), 3);
    assert!(coverage.incomplete.is_empty());
    assert!(coverage
        .sessions
        .iter()
        .any(|s| s.session_key == SessionKey(100) && s.positions == 8 && s.laps == 5));
}

// ============================================================================
// HEALTH, METRICS, OPENAPI
// ============================================================================

#[tokio::test]
async fn test_ready_when_populated() {
    let (status, _) = get(router(true).await, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_not_ready_when_empty() {
    let (status, body) = get(router(false).await, "/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("\"status\":\"unhealthy\""));
}

#[tokio::test]
async fn test_ping() {
    let (status, body) = get(router(false).await, "/health/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"pong");
}

#[tokio::test]
async fn test_metrics_endpoint_counts_requests() {
    let app = router(true).await;
    let (status, _) = get(app.clone(), "/api/v1/drivers").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("paddock_http_requests_total"));
}

#[cfg(feature = "openapi")]
#[tokio::test]
async fn test_openapi_document_served() {
    let (status, body) = get(router(false).await, "/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    let doc: serde_json::Value = serde_json::from_slice(&body).expect("openapi should be JSON");
    assert!(doc["paths"]["/api/v1/season/summary"].is_object());
}
