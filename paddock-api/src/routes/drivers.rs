//! Driver REST API Routes

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use paddock_analytics::{DriverDetail, DriverPositions};
use paddock_core::{Driver, DriverNumber};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/v1/drivers - All cached drivers ordered by number
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/v1/drivers",
    tag = "Drivers",
    responses(
        (status = 200, description = "Cached drivers", body = Vec<Driver>),
        (status = 500, description = "Store failure", body = ApiError),
    ),
))]
pub async fn list_drivers(State(state): State<AppState>) -> ApiResult<Json<Vec<Driver>>> {
    Ok(Json(state.analytics.list_drivers().await?))
}

/// GET /api/v1/drivers/{id} - Career summary and per-race results
///
/// `id` is a driver number, or a 1-based position in the driver listing
/// when no driver carries that number.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/v1/drivers/{id}",
    tag = "Drivers",
    params(("id" = String, Path, description = "Driver number or 1-based listing index")),
    responses(
        (status = 200, description = "Driver detail", body = DriverDetail),
        (status = 404, description = "Driver not found", body = ApiError),
        (status = 500, description = "Store failure", body = ApiError),
    ),
))]
pub async fn get_driver(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DriverDetail>> {
    Ok(Json(state.analytics.driver_detail(&id).await?))
}

/// GET /api/v1/drivers/{id}/positions - Position history of one driver
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/v1/drivers/{id}/positions",
    tag = "Drivers",
    params(("id" = u32, Path, description = "Driver number")),
    responses(
        (status = 200, description = "Chronological positions", body = DriverPositions),
        (status = 400, description = "Driver number is not numeric", body = ApiError),
        (status = 404, description = "Driver not found", body = ApiError),
    ),
))]
pub async fn get_driver_positions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DriverPositions>> {
    let number: DriverNumber = id
        .parse()
        .map_err(|_| ApiError::invalid_input(format!("Invalid driver number: {}", id)))?;
    Ok(Json(state.analytics.driver_positions(number).await?))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_drivers))
        .route("/:id", get(get_driver))
        .route("/:id/positions", get(get_driver_positions))
        .with_state(state)
}
