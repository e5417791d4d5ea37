mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let app = common::test_app();
    let (status, body) = common::send_json(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn register_then_login_yields_the_same_identity() -> Result<()> {
    let app = common::test_app();
    let register_token = common::register(&app, "Ada", "ada@example.com").await;
    let registered_id = common::user_id(&app, &register_token).await;

    let (status, body) = common::send_json(
        &app,
        Method::POST,
        "/users/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let login_token = body["token"].as_str().unwrap().to_string();

    assert_eq!(common::user_id(&app, &login_token).await, registered_id);
    Ok(())
}

#[tokio::test]
async fn current_user_excludes_the_password_hash() -> Result<()> {
    let app = common::test_app();
    let token = common::register(&app, "Ada", "ada@example.com").await;

    let (status, body) = common::send_json(&app, Method::GET, "/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ada");
    assert_eq!(body["email"], "ada@example.com");
    assert!(body.get("password").is_none());
    Ok(())
}

#[tokio::test]
async fn missing_token_is_rejected_with_exact_message() -> Result<()> {
    let app = common::test_app();
    let (status, body) = common::send_json(&app, Method::GET, "/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["msg"], "Token Is Not Available, authorization denied");
    Ok(())
}

#[tokio::test]
async fn invalid_token_is_rejected_with_exact_message() -> Result<()> {
    let app = common::test_app();
    let (status, body) =
        common::send_json(&app, Method::GET, "/users", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["msg"], "Token Is Not Valid, authorization denied");
    Ok(())
}

#[tokio::test]
async fn register_reports_every_invalid_field() -> Result<()> {
    let app = common::test_app();
    let (status, body) =
        common::send_json(&app, Method::POST, "/users/register", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 3);
    assert_eq!(errors[0]["msg"], "Name is required");
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_is_rejected() -> Result<()> {
    let app = common::test_app();
    common::register(&app, "Ada", "ada@example.com").await;

    let (status, body) = common::send_json(
        &app,
        Method::POST,
        "/users/register",
        None,
        Some(json!({ "name": "Other", "email": "ada@example.com", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["msg"], "User already exists");
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials() -> Result<()> {
    let app = common::test_app();
    common::register(&app, "Ada", "ada@example.com").await;

    let (status, body) = common::send_json(
        &app,
        Method::POST,
        "/users/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["msg"], "Invalid credentials");
    Ok(())
}

#[tokio::test]
async fn unknown_email_is_also_invalid_credentials() -> Result<()> {
    let app = common::test_app();
    let (status, body) = common::send_json(
        &app,
        Method::POST,
        "/users/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["msg"], "Invalid credentials");
    Ok(())
}
