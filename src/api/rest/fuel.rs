use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    domain::models::VehicleFuelSnapshot,
    infrastructure::{auth::AuthenticatedUser, state::AppState},
    services::fuel::{FuelService, RecordFuelRequest},
};

use super::{to_response, ApiError};

pub fn router() -> Router {
    Router::new()
        .route("/", post(record_fill))
        .route("/latest/:vehicle_id", get(latest_fuel))
}

async fn record_fill(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<RecordFuelRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let record = FuelService::new(state)
        .record_fill(&user, payload)
        .await
        .map_err(to_response)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "record": record })),
    ))
}

async fn latest_fuel(
    Extension(state): Extension<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let record = FuelService::new(state)
        .latest(vehicle_id)
        .await
        .map_err(to_response)?;
    let snapshot = record.as_ref().map(VehicleFuelSnapshot::from);
    Ok(Json(
        serde_json::json!({ "record": record, "snapshot": snapshot }),
    ))
}
