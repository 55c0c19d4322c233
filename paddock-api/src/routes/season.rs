//! Season Summary Route

use axum::{extract::State, routing::get, Json, Router};
use paddock_analytics::SeasonSummary;

use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/v1/season/summary - Leaderboards for the configured season
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/v1/season/summary",
    tag = "Season",
    responses(
        (status = 200, description = "Season leaderboards", body = SeasonSummary),
        (status = 500, description = "Store failure", body = crate::error::ApiError),
    ),
))]
pub async fn season_summary(State(state): State<AppState>) -> ApiResult<Json<SeasonSummary>> {
    Ok(Json(state.analytics.season_summary().await?))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/summary", get(season_summary))
        .with_state(state)
}
