use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
    Extension,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::ProfileView;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::profile_service::{
    AvatarUpload, EducationPayload, ExperiencePayload, ProfilePayload,
};
use crate::state::AppState;

/// POST /profiles - create or update the caller's profile
pub async fn upsert(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<ProfilePayload>,
) -> Result<Json<ProfileView>, ApiError> {
    let view = state.profile_service().upsert(auth.id, payload).await?;
    Ok(Json(view))
}

/// GET /profiles/me - the caller's profile
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ProfileView>, ApiError> {
    let view = state.profile_service().own_profile(auth.id).await?;
    Ok(Json(view))
}

/// GET /profiles - all profiles
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<ProfileView>>, ApiError> {
    let views = state.profile_service().all_profiles().await?;
    Ok(Json(views))
}

/// GET /profiles/user/:user_id - one profile by owner id
pub async fn by_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ProfileView>, ApiError> {
    let view = state.profile_service().profile_for(user_id).await?;
    Ok(Json(view))
}

/// DELETE /profiles - cascade-delete the caller's posts, profile, and account
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    state.profile_service().delete_account(auth.id).await?;
    Ok(Json(json!({ "msg": "User Information Is Deleted Successfully" })))
}

/// POST /profiles/upload - store an avatar and attach its URL to the profile
pub async fn upload(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let content_type = headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let outcome = state
        .profile_service()
        .attach_avatar(auth.id, body.to_vec(), &content_type)
        .await?;

    match outcome {
        AvatarUpload::Attached(view) => Ok(Json(json!(view))),
        AvatarUpload::Unattached { image } => Ok(Json(json!({ "image": image }))),
    }
}

/// PUT /profiles/experience - add a work-history entry
pub async fn add_experience(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<ExperiencePayload>,
) -> Result<Json<ProfileView>, ApiError> {
    let view = state
        .profile_service()
        .add_experience(auth.id, payload)
        .await?;
    Ok(Json(view))
}

/// DELETE /profiles/experience/:exp_id - remove a work-history entry
pub async fn remove_experience(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(exp_id): Path<Uuid>,
) -> Result<Json<ProfileView>, ApiError> {
    let view = state
        .profile_service()
        .remove_experience(auth.id, exp_id)
        .await?;
    Ok(Json(view))
}

/// PUT /profiles/education - add an education entry
pub async fn add_education(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<EducationPayload>,
) -> Result<Json<ProfileView>, ApiError> {
    let view = state
        .profile_service()
        .add_education(auth.id, payload)
        .await?;
    Ok(Json(view))
}

/// DELETE /profiles/education/:edu_id - remove an education entry
pub async fn remove_education(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(edu_id): Path<Uuid>,
) -> Result<Json<ProfileView>, ApiError> {
    let view = state
        .profile_service()
        .remove_education(auth.id, edu_id)
        .await?;
    Ok(Json(view))
}
