#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use devhub_api::app::app;
use devhub_api::config::AppConfig;
use devhub_api::state::AppState;

/// Build the full application over the in-memory backend. Each call is an
/// isolated world: no database, no network.
pub fn test_app() -> Router {
    app(AppState::in_memory(AppConfig::development()))
}

/// Send a JSON request and decode the JSON response (Null when empty).
pub async fn send_json(
    app: &Router,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header("x-auth-token", token);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Send a raw byte body (avatar upload).
pub async fn send_bytes(
    app: &Router,
    path: &str,
    token: &str,
    body: Vec<u8>,
    content_type: &str,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header("x-auth-token", token)
        .header("content-type", content_type)
        .body(Body::from(body))
        .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Register an account and return its token.
pub async fn register(app: &Router, name: &str, email: &str) -> String {
    let (status, body) = send_json(
        app,
        Method::POST,
        "/users/register",
        None,
        Some(json!({ "name": name, "email": email, "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    body["token"].as_str().expect("token").to_string()
}

/// Create a minimal valid profile for the token's owner.
pub async fn create_profile(app: &Router, token: &str) -> Value {
    let (status, body) = send_json(
        app,
        Method::POST,
        "/profiles",
        Some(token),
        Some(json!({ "status": "Developer", "skills": "rust" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "profile upsert failed: {body}");
    body
}

/// The caller's identity id, via GET /users.
pub async fn user_id(app: &Router, token: &str) -> String {
    let (status, body) = send_json(app, Method::GET, "/users", Some(token), None).await;
    assert_eq!(status, StatusCode::OK, "GET /users failed: {body}");
    body["id"].as_str().expect("id").to_string()
}
