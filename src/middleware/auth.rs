use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Custom header carrying the signed identity token.
pub const AUTH_HEADER: &str = "x-auth-token";

/// Authenticated identity extracted from a verified token and attached to the
/// request for downstream handlers.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
}

/// Authentication guard. Extracts the token from the `x-auth-token` header,
/// verifies it, and injects the resolved identity into the request context.
///
/// This is a pure gate: no business logic runs here, and every handler behind
/// it can assume an `AuthUser` extension is present.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTH_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Token Is Not Available, authorization denied"))?
        .to_string();

    let user_id = state
        .tokens
        .verify(&token)
        .map_err(|_| ApiError::unauthorized("Token Is Not Valid, authorization denied"))?;

    request.extensions_mut().insert(AuthUser { id: user_id });
    Ok(next.run(request).await)
}
