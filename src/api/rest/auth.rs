use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::{
    domain::models::MasterKind,
    infrastructure::{auth::issue_token, state::AppState},
};

use super::{to_response, ApiError};

pub fn router() -> Router {
    Router::new().route("/login", post(login))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    user_name: String,
    credential: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    user_id: Uuid,
}

/// Exchanges an app user's name and the shared developer credential for a
/// bearer token.
async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let expected = state.config.auth.developer_credential.as_bytes();
    if expected.is_empty() || !bool::from(payload.credential.as_bytes().ct_eq(expected)) {
        return Err(unauthorized());
    }

    let user = state
        .store
        .find_master_by_name(MasterKind::AppUser, payload.user_name.trim())
        .await
        .map_err(|err| to_response(err.into()))?;
    let Some(user) = user else {
        return Err(unauthorized());
    };

    let token = issue_token(&state, user.id).map_err(to_response)?;
    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
    }))
}

fn unauthorized() -> ApiError {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": "invalid_credentials" })),
    )
}
