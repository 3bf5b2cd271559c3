use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Current wall-clock time as unix milliseconds. All timestamps in the
/// data model (creation, expiry, watermarks) use this representation.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: Vec<u8>,
    #[serde(skip_serializing)]
    pub password_salt: Vec<u8>,
    pub color: String,
    pub email: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub created_at: i64,
    pub expires_at: i64,
}

impl Session {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub username: String,
    pub content: String,
    /// Author's display color at send time. Snapshot, not a live reference.
    pub color: String,
    pub created_at: i64,
    pub edited: bool,
    pub edited_at: Option<i64>,
}

/// Content change applied to an existing message.
#[derive(Debug, Clone)]
pub struct MessagePatch {
    pub content: String,
    pub edited_at: i64,
}
