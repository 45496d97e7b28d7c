use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    infrastructure::{auth::AuthenticatedUser, state::AppState},
    services::vehicles::{VehicleState, VehicleStateResolver},
};

pub fn router() -> Router {
    Router::new().route("/:id/state", get(vehicle_state))
}

/// Never fails: lookups that error out resolve to empty defaults.
async fn vehicle_state(
    Extension(state): Extension<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Json<VehicleState> {
    let today = Utc::now().date_naive();
    Json(VehicleStateResolver::new(state).resolve(id, today).await)
}
