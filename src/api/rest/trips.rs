use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    domain::draft::TripDraft,
    infrastructure::{auth::AuthenticatedUser, state::AppState},
    services::{
        submission::{SubmissionOutcome, SubmissionService},
        trips::{apply_edits, ApplyEditsRequest, TripService},
    },
};

use super::{to_response, ApiError};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_trip))
        .route("/drafts/apply", post(apply_draft_edits))
        .route("/latest/:vehicle_id", get(latest_trip))
        .route("/:id", get(get_trip).put(update_trip))
}

async fn create_trip(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(draft): Json<TripDraft>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let outcome = SubmissionService::new(state)
        .create(&user, draft)
        .await
        .map_err(to_response)?;
    outcome_response(outcome, StatusCode::CREATED)
}

async fn update_trip(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(draft): Json<TripDraft>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let outcome = SubmissionService::new(state)
        .update(&user, id, draft)
        .await
        .map_err(to_response)?;
    outcome_response(outcome, StatusCode::OK)
}

async fn get_trip(
    Extension(state): Extension<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let trip = TripService::new(state).get(id).await.map_err(to_response)?;
    Ok(Json(serde_json::json!({ "trip": trip })))
}

async fn latest_trip(
    Extension(state): Extension<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let trip = TripService::new(state)
        .latest_for_vehicle(vehicle_id)
        .await
        .map_err(to_response)?;
    let last_date = trip.last_date();
    let last_destination = trip.end_location().map(str::to_owned);
    Ok(Json(serde_json::json!({
        "trip": trip,
        "lastDate": last_date,
        "lastDestination": last_destination,
    })))
}

async fn apply_draft_edits(
    _user: AuthenticatedUser,
    Json(request): Json<ApplyEditsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let draft = apply_edits(request).map_err(to_response)?;
    Ok(Json(serde_json::json!({ "draft": draft })))
}

/// A blocked submission is a 422 carrying the reason and the draft to show
/// back to the user, with any fields the block cleared.
fn outcome_response(
    outcome: SubmissionOutcome,
    persisted: StatusCode,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    match outcome {
        SubmissionOutcome::Persisted { trip, attendance } => Ok((
            persisted,
            Json(serde_json::json!({ "trip": trip, "attendance": attendance })),
        )),
        SubmissionOutcome::Blocked { reason, draft } => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "error": reason.to_string(),
                "blocked": reason,
                "draft": draft,
            })),
        )),
    }
}
