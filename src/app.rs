use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{protected, public};
use crate::middleware::require_auth;
use crate::state::AppState;

/// Assemble the full router: public routes, guarded routes behind the
/// authentication middleware, and the global layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        .merge(guarded_routes(&state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(public::users::register))
        .route("/users/login", post(public::users::login))
}

fn guarded_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/users", get(protected::users::current))
        .route(
            "/profiles",
            post(protected::profiles::upsert)
                .get(protected::profiles::list)
                .delete(protected::profiles::delete_account),
        )
        .route("/profiles/me", get(protected::profiles::me))
        .route("/profiles/user/:user_id", get(protected::profiles::by_user))
        .route(
            "/profiles/upload",
            post(protected::profiles::upload)
                .layer(DefaultBodyLimit::max(state.config.api.max_upload_bytes)),
        )
        .route("/profiles/experience", put(protected::profiles::add_experience))
        .route(
            "/profiles/experience/:exp_id",
            delete(protected::profiles::remove_experience),
        )
        .route("/profiles/education", put(protected::profiles::add_education))
        .route(
            "/profiles/education/:edu_id",
            delete(protected::profiles::remove_education),
        )
        .layer(from_fn_with_state(state.clone(), require_auth))
}

async fn root() -> &'static str {
    "Server Is Working Correctly"
}

async fn health() -> axum::response::Json<Value> {
    axum::response::Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
    }))
}
