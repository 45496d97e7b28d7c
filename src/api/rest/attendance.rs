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
    services::attendance::{AttendanceService, CreateAttendanceRequest},
};

use super::{to_response, ApiError};

pub fn router() -> Router {
    Router::new().route("/", get(list_attendance).post(create_attendance))
}

#[derive(Debug, Deserialize)]
struct AttendanceQuery {
    #[serde(rename = "driverId", alias = "driver_id")]
    driver_id: Uuid,
}

async fn list_attendance(
    Extension(state): Extension<Arc<AppState>>,
    _user: AuthenticatedUser,
    Query(query): Query<AttendanceQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let records = AttendanceService::new(state)
        .list(query.driver_id)
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!({ "attendance": records })))
}

/// A second record for the same driver and date is a 409.
async fn create_attendance(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateAttendanceRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let record = AttendanceService::new(state)
        .create(&user, payload)
        .await
        .map_err(to_response)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "attendance": record })),
    ))
}
