use std::sync::Arc;

use crate::auth::token;
use crate::error::AppError;
use crate::store::models::{now_millis, Session};
use crate::store::SessionStore;

const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Issues, validates and revokes bearer tokens. A session is valid iff it
/// exists in the store and `now < expires_at`; expiry and revocation are
/// both terminal. A user may hold any number of concurrent sessions.
pub struct SessionManager {
    sessions: Arc<dyn SessionStore>,
    ttl_hours: i64,
}

impl SessionManager {
    pub fn new(sessions: Arc<dyn SessionStore>, ttl_hours: i64) -> Self {
        Self { sessions, ttl_hours }
    }

    /// Issue a fresh token for the user. Existing sessions are untouched.
    pub async fn create(&self, username: &str) -> Result<Session, AppError> {
        let created_at = now_millis();
        // ttl comes from operator config; saturate rather than overflow on
        // an absurd value.
        let ttl = self.ttl_hours.saturating_mul(MILLIS_PER_HOUR);
        let session = Session {
            token: token::generate(),
            username: username.to_string(),
            created_at,
            expires_at: created_at.saturating_add(ttl),
        };
        self.sessions.insert(session.clone()).await?;
        Ok(session)
    }

    /// Resolve a token to its username. An unknown token is
    /// `Unauthenticated`; a known-but-expired one is `SessionExpired` and
    /// is dropped from the store on the way out.
    pub async fn resolve(&self, token: &str) -> Result<String, AppError> {
        let session = self
            .sessions
            .get(token)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("invalid session token".to_string()))?;

        if session.is_expired(now_millis()) {
            // Opportunistic GC; the hourly sweep catches anything missed.
            if let Err(e) = self.sessions.delete(token).await {
                tracing::warn!("failed to drop expired session: {}", e);
            }
            return Err(AppError::SessionExpired);
        }

        Ok(session.username)
    }

    /// Idempotent; revoking an absent token is not an error.
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        self.sessions.delete(token).await
    }

    /// Currently live sessions, possibly several per user.
    pub async fn active(&self, now: i64) -> Result<Vec<Session>, AppError> {
        self.sessions.list_active(now).await
    }

    /// Background garbage collection of expired rows.
    pub async fn sweep_expired(&self) -> Result<u64, AppError> {
        self.sessions.delete_expired(now_millis()).await
    }
}
