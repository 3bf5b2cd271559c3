use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::api::{bearer_token, AppState};
use crate::chat::{ActiveUser, AuthenticatedUser};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /api/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthenticatedUser>, AppError> {
    let authed = state
        .service
        .register(&req.username, &req.password, req.email.as_deref())
        .await?;
    Ok(Json(authed))
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthenticatedUser>, AppError> {
    let authed = state.service.login(&req.username, &req.password).await?;
    Ok(Json(authed))
}

/// POST /api/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    state.service.logout(bearer_token(&headers)).await?;
    Ok(Json(serde_json::json!({"success": true})))
}

/// GET /api/me
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ActiveUser>, AppError> {
    let user = state.service.current_user(bearer_token(&headers)).await?;
    Ok(Json(user))
}
