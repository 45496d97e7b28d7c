use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    infrastructure::{auth::AuthenticatedUser, state::AppState},
    services::budgets::{AllocateBudgetRequest, BudgetStatus, DriverBudgetService},
};

use super::{to_response, ApiError};

pub fn router() -> Router {
    Router::new()
        .route("/", post(allocate_budget))
        .route("/latest/:driver_id", get(latest_budget))
}

async fn allocate_budget(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<AllocateBudgetRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let budget = DriverBudgetService::new(state)
        .allocate(&user, payload)
        .await
        .map_err(to_response)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "budget": budget })),
    ))
}

async fn latest_budget(
    Extension(state): Extension<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<BudgetStatus>, ApiError> {
    let status = DriverBudgetService::new(state)
        .status(driver_id)
        .await
        .map_err(to_response)?;
    Ok(Json(status))
}
