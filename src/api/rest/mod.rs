use axum::{http::StatusCode, routing::get, Json, Router};

use crate::{
    api::rest::{
        attendance::router as attendance_router, auth::router as auth_router,
        budgets::router as budgets_router, fuel::router as fuel_router,
        reference::router as reference_router, standby::router as standby_router,
        trips::router as trips_router, vehicles::router as vehicles_router,
    },
    services::errors::ServiceError,
};

pub mod attendance;
pub mod auth;
pub mod budgets;
pub mod fuel;
pub mod health;
pub mod reference;
pub mod standby;
pub mod trips;
pub mod vehicles;

pub type ApiError = (StatusCode, Json<serde_json::Value>);

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health::healthcheck))
        .nest("/auth", auth_router())
        .merge(reference_router())
        .nest("/vehicles", vehicles_router())
        .nest("/trips", trips_router())
        .nest("/fuel-tracking", fuel_router())
        .nest("/driver-budgets", budgets_router())
        .nest("/standby", standby_router())
        .nest("/attendance", attendance_router())
}

pub(crate) fn to_response(err: ServiceError) -> ApiError {
    (
        err.status_code(),
        Json(serde_json::json!({ "error": err.to_string() })),
    )
}
