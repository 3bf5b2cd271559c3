use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{bearer_token, AppState};
use crate::chat::ActiveUser;
use crate::error::AppError;
use crate::store::models::Message;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct EditMessageRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    /// Watermark: unix milliseconds or RFC 3339. Only strictly newer
    /// messages are returned.
    pub since: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<ActiveUser>,
}

/// POST /api/messages
pub async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<Message>, AppError> {
    let message = state
        .service
        .send_message(bearer_token(&headers), &req.content)
        .await?;
    Ok(Json(message))
}

/// GET /api/messages?since=
pub async fn get_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessagesResponse>, AppError> {
    let messages = state
        .service
        .list_messages(bearer_token(&headers), query.since.as_deref())
        .await?;
    Ok(Json(MessagesResponse { messages }))
}

/// PUT /api/messages/:id
pub async fn edit_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<EditMessageRequest>,
) -> Result<Json<Message>, AppError> {
    let message = state
        .service
        .edit_message(bearer_token(&headers), &id, &req.content)
        .await?;
    Ok(Json(message))
}

/// DELETE /api/messages/:id
pub async fn delete_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .service
        .delete_message(bearer_token(&headers), &id)
        .await?;
    Ok(Json(serde_json::json!({"success": true})))
}

/// GET /api/users
pub async fn get_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UsersResponse>, AppError> {
    let users = state.service.active_users(bearer_token(&headers)).await?;
    Ok(Json(UsersResponse { users }))
}
