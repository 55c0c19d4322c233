//! Cache Coverage Route

use axum::{extract::State, routing::get, Json, Router};
use paddock_analytics::DataCoverage;

use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/v1/coverage - Row counts per session
///
/// Lists the sessions missing position or lap rows.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/v1/coverage",
    tag = "Coverage",
    responses(
        (status = 200, description = "Cache coverage", body = DataCoverage),
        (status = 500, description = "Store failure", body = crate::error::ApiError),
    ),
))]
pub async fn data_coverage(State(state): State<AppState>) -> ApiResult<Json<DataCoverage>> {
    Ok(Json(state.analytics.data_coverage().await?))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(data_coverage))
        .with_state(state)
}
