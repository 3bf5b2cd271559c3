//! Router-level tests: the HTTP binding over the in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use flowchat_server::api::{create_router, AppState};
use flowchat_server::chat::ChatService;
use flowchat_server::config::Config;
use flowchat_server::store::memory::MemoryStore;

fn app() -> Router {
    let config = Config::default();
    let store = Arc::new(MemoryStore::new(config.message_retention_limit));
    let service = Arc::new(ChatService::new(
        store.clone(),
        store.clone(),
        store,
        &config,
    ));
    create_router(AppState { service }, Duration::from_secs(30))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, username: &str, password: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/register",
        None,
        Some(json!({"username": username, "password": password})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {}", body);
    body
}

#[tokio::test]
async fn health_check_works() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn register_login_and_me() {
    let app = app();
    let registered = register(&app, "alice", "password1").await;
    assert_eq!(registered["username"], "alice");
    assert!(registered["token"].as_str().is_some());
    // The password digest never leaves the server.
    assert!(registered.get("password_hash").is_none());

    let (status, body) = send(
        &app,
        "POST",
        "/api/login",
        None,
        Some(json!({"username": "alice", "password": "password1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "GET", "/api/me", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["color"], registered["color"]);
}

#[tokio::test]
async fn duplicate_registration_is_conflict() {
    let app = app();
    register(&app, "alice", "password1").await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({"username": "alice", "password": "password2"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_registration_is_bad_request() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({"username": "al", "password": "password1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("username"));

    let (status, _) = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({"username": "alice", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_credentials_are_unauthorized() {
    let app = app();
    register(&app, "alice", "password1").await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/login",
        None,
        Some(json!({"username": "alice", "password": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_bearer_token() {
    let app = app();
    let (status, _) = send(&app, "GET", "/api/messages", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Wrong scheme is treated as no token at all.
    let request = Request::builder()
        .method("GET")
        .uri("/api/messages")
        .header(header::AUTHORIZATION, "Basic abc123")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/messages", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn message_round_trip_with_watermark() {
    let app = app();
    let alice = register(&app, "alice", "password1").await;
    let token = alice["token"].as_str().unwrap().to_string();

    let (status, sent) = send(
        &app,
        "POST",
        "/api/messages",
        Some(token.as_str()),
        Some(json!({"content": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["username"], "alice");
    assert_eq!(sent["color"], alice["color"]);
    assert_eq!(sent["edited"], false);

    let (status, body) = send(&app, "GET", "/api/messages", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);

    // Polling from the message's own timestamp returns nothing new.
    let since = sent["created_at"].as_i64().unwrap();
    let uri = format!("/api/messages?since={}", since);
    let (status, body) = send(&app, "GET", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["messages"].as_array().unwrap().is_empty());

    let (status, _) = send(
        &app,
        "GET",
        "/api/messages?since=not-a-time",
        Some(token.as_str()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn edit_and_delete_respect_ownership() {
    let app = app();
    let alice = register(&app, "alice", "password1").await;
    let bob = register(&app, "bob", "password2").await;
    let alice_token = alice["token"].as_str().unwrap().to_string();
    let bob_token = bob["token"].as_str().unwrap().to_string();

    let (_, sent) = send(
        &app,
        "POST",
        "/api/messages",
        Some(alice_token.as_str()),
        Some(json!({"content": "original"})),
    )
    .await;
    let id = sent["id"].as_str().unwrap().to_string();
    let uri = format!("/api/messages/{}", id);

    let (status, _) = send(
        &app,
        "PUT",
        &uri,
        Some(bob_token.as_str()),
        Some(json!({"content": "hijacked"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, edited) = send(
        &app,
        "PUT",
        &uri,
        Some(alice_token.as_str()),
        Some(json!({"content": "corrected"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["content"], "corrected");
    assert_eq!(edited["edited"], true);

    let (status, _) = send(&app, "DELETE", &uri, Some(bob_token.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &uri, Some(alice_token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "DELETE", &uri, Some(alice_token.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn active_users_roster_deduplicates() {
    let app = app();
    let alice = register(&app, "alice", "password1").await;
    let token = alice["token"].as_str().unwrap().to_string();
    // Second concurrent session for alice.
    send(
        &app,
        "POST",
        "/api/login",
        None,
        Some(json!({"username": "alice", "password": "password1"})),
    )
    .await;
    register(&app, "bob", "password2").await;

    let (status, body) = send(&app, "GET", "/api/users", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);

    // Logout invalidates the token for further roster calls.
    let (status, _) = send(&app, "POST", "/api/logout", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/api/users", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
