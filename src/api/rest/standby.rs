use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    infrastructure::{auth::AuthenticatedUser, state::AppState},
    services::standby::{CreateStandbyRequest, StandbyService},
};

use super::{to_response, ApiError};

pub fn router() -> Router {
    Router::new().route("/", get(latest_standby).post(create_standby))
}

#[derive(Debug, Deserialize)]
struct StandbyQuery {
    #[serde(rename = "vehicleId", alias = "vehicle_id")]
    vehicle_id: Uuid,
}

async fn latest_standby(
    Extension(state): Extension<Arc<AppState>>,
    _user: AuthenticatedUser,
    Query(query): Query<StandbyQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let record = StandbyService::new(state)
        .latest(query.vehicle_id)
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!({ "standby": record })))
}

async fn create_standby(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateStandbyRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let record = StandbyService::new(state)
        .create(&user, payload)
        .await
        .map_err(to_response)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "standby": record })),
    ))
}
