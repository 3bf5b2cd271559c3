use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::auth::{AuthGateway, Credentials, SessionManager};
use crate::chat::Messages;
use crate::config::Config;
use crate::error::AppError;
use crate::store::models::{now_millis, Message};
use crate::store::{MessageStore, SessionStore, UserStore};

/// Outcome of register/login: identity plus a fresh bearer token.
#[derive(Debug, Serialize)]
pub struct AuthenticatedUser {
    pub username: String,
    pub color: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ActiveUser {
    pub username: String,
    pub color: String,
}

/// Orchestrator over credentials, sessions and the message log. Holds no
/// state of its own; every protected operation goes through the gateway
/// first.
pub struct ChatService {
    credentials: Credentials,
    sessions: Arc<SessionManager>,
    gateway: AuthGateway,
    messages: Messages,
}

impl ChatService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        messages: Arc<dyn MessageStore>,
        config: &Config,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(sessions, config.session_ttl_hours));
        Self {
            credentials: Credentials::new(users, config),
            gateway: AuthGateway::new(sessions.clone()),
            messages: Messages::new(messages, config),
            sessions,
        }
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<AuthenticatedUser, AppError> {
        let user = self.credentials.register(username, password, email).await?;
        let session = self.sessions.create(&user.username).await?;
        Ok(AuthenticatedUser {
            username: user.username,
            color: user.color,
            token: session.token,
        })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthenticatedUser, AppError> {
        let user = self.credentials.verify(username, password).await?;
        let session = self.sessions.create(&user.username).await?;
        Ok(AuthenticatedUser {
            username: user.username,
            color: user.color,
            token: session.token,
        })
    }

    pub async fn logout(&self, token: Option<&str>) -> Result<(), AppError> {
        let token = token
            .ok_or_else(|| AppError::Unauthenticated("missing bearer token".to_string()))?;
        self.sessions.revoke(token).await
    }

    pub async fn current_user(&self, token: Option<&str>) -> Result<ActiveUser, AppError> {
        let username = self.gateway.authenticate(token).await?;
        let user = self.credentials.get(&username).await?;
        Ok(ActiveUser {
            username: user.username,
            color: user.color,
        })
    }

    pub async fn send_message(
        &self,
        token: Option<&str>,
        content: &str,
    ) -> Result<Message, AppError> {
        let username = self.gateway.authenticate(token).await?;
        let author = self.credentials.get(&username).await?;
        self.messages.send(&author, content).await
    }

    pub async fn list_messages(
        &self,
        token: Option<&str>,
        since: Option<&str>,
    ) -> Result<Vec<Message>, AppError> {
        self.gateway.authenticate(token).await?;
        self.messages.list(since).await
    }

    pub async fn edit_message(
        &self,
        token: Option<&str>,
        id: &str,
        content: &str,
    ) -> Result<Message, AppError> {
        let username = self.gateway.authenticate(token).await?;
        self.messages.edit(id, content, &username).await
    }

    pub async fn delete_message(&self, token: Option<&str>, id: &str) -> Result<(), AppError> {
        let username = self.gateway.authenticate(token).await?;
        self.messages.delete(id, &username).await
    }

    /// Users with at least one live session, deduplicated and joined with
    /// their stored color. A user holding several sessions appears once.
    pub async fn active_users(&self, token: Option<&str>) -> Result<Vec<ActiveUser>, AppError> {
        self.gateway.authenticate(token).await?;

        let sessions = self.sessions.active(now_millis()).await?;
        let usernames: BTreeSet<String> =
            sessions.into_iter().map(|s| s.username).collect();

        let mut users = Vec::with_capacity(usernames.len());
        for username in usernames {
            match self.credentials.find(&username).await? {
                Some(user) => users.push(ActiveUser {
                    username: user.username,
                    color: user.color,
                }),
                // Sessions reference registered users; tolerate a gap
                // rather than failing the whole roster.
                None => tracing::warn!(%username, "active session for unknown user"),
            }
        }
        Ok(users)
    }

    /// Hourly background GC entry point.
    pub async fn sweep_sessions(&self) -> Result<u64, AppError> {
        self.sessions.sweep_expired().await
    }
}
