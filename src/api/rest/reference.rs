use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::{
    domain::models::MasterKind,
    infrastructure::{auth::AuthenticatedUser, state::AppState},
    services::{
        errors::ServiceError,
        reference::{CreateMasterRequest, ReferenceService},
    },
};

use super::{to_response, ApiError};

pub fn router() -> Router {
    Router::new()
        .route("/reference", get(load_reference))
        .route("/master/:kind", post(create_master))
}

async fn load_reference(
    Extension(state): Extension<Arc<AppState>>,
    _user: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let data = ReferenceService::new(state)
        .load()
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!({ "reference": data })))
}

async fn create_master(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(kind): Path<String>,
    Json(payload): Json<CreateMasterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let kind: MasterKind = kind
        .parse()
        .map_err(|_| to_response(ServiceError::NotFound))?;
    let record = ReferenceService::new(state)
        .create_inline(&user, kind, payload)
        .await
        .map_err(to_response)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "record": record })),
    ))
}
