use axum::{extract::State, response::Json, Extension};

use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// GET /users - the caller's identity record, sans password hash.
///
/// Returns 404 when the account was deleted: the token stays
/// cryptographically valid until expiry, so the lookup is the backstop.
pub async fn current(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<User>, ApiError> {
    let user = state.user_service().current_user(auth.id).await?;
    Ok(Json(user))
}
