use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::services::user_service::{LoginPayload, RegisterPayload};
use crate::state::AppState;

/// POST /users/register - create an identity and return its first token
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<Json<Value>, ApiError> {
    let token = state.user_service().register(payload).await?;
    Ok(Json(json!({ "token": token })))
}

/// POST /users/login - verify credentials and issue a token
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<Value>, ApiError> {
    let token = state.user_service().login(payload).await?;
    Ok(Json(json!({ "token": token })))
}
