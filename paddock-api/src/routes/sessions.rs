//! Session REST API Routes

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use paddock_analytics::SessionDetail;
use paddock_core::{Session, SessionKey};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/v1/sessions - All cached sessions in store order
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/v1/sessions",
    tag = "Sessions",
    responses(
        (status = 200, description = "Cached sessions", body = Vec<Session>),
        (status = 500, description = "Store failure", body = ApiError),
    ),
))]
pub async fn list_sessions(State(state): State<AppState>) -> ApiResult<Json<Vec<Session>>> {
    Ok(Json(state.analytics.list_sessions().await?))
}

/// GET /api/v1/sessions/{key} - Podium, last place, fastest lap and top speed
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/v1/sessions/{key}",
    tag = "Sessions",
    params(("key" = u32, Path, description = "Session key")),
    responses(
        (status = 200, description = "Session detail", body = SessionDetail),
        (status = 400, description = "Session key is not numeric", body = ApiError),
        (status = 404, description = "Session not found", body = ApiError),
    ),
))]
pub async fn get_session(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<SessionDetail>> {
    let key: SessionKey = key
        .parse()
        .map_err(|_| ApiError::invalid_input(format!("Invalid session key: {}", key)))?;
    Ok(Json(state.analytics.session_detail(key).await?))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_sessions))
        .route("/:key", get(get_session))
        .with_state(state)
}
