pub mod auth;
pub mod chat;
pub mod state;

pub use state::AppState;

use std::time::Duration;

use axum::http::{header, HeaderMap};
use axum::routing::{get, post, put};
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Pull the token out of `Authorization: Bearer <token>`. `None` covers a
/// missing header, a non-UTF8 value and a wrong scheme alike; the service
/// turns that into an unauthenticated error.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        // Health check
        .route("/api/health", get(health))
        // Authentication endpoints
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/me", get(auth::me))
        // Chat endpoints
        .route(
            "/api/messages",
            post(chat::send_message).get(chat::get_messages),
        )
        .route(
            "/api/messages/:id",
            put(chat::edit_message).delete(chat::delete_message),
        )
        .route("/api/users", get(chat::get_users))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
