//! In-process backend. Suitable for single-instance deployments and tests;
//! state does not survive a restart.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::store::models::{Message, MessagePatch, Session, User};
use crate::store::{MessageStore, SessionStore, UserStore};

pub struct MemoryStore {
    users: Mutex<HashMap<String, User>>,
    sessions: Mutex<HashMap<String, Session>>,
    messages: Mutex<VecDeque<Message>>,
    retention_limit: usize,
}

impl MemoryStore {
    pub fn new(retention_limit: usize) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            messages: Mutex::new(VecDeque::new()),
            retention_limit,
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: User) -> Result<(), AppError> {
        let mut users = self.users.lock().await;
        // Check-then-insert under one lock so a concurrent duplicate
        // registration observes the conflict instead of overwriting.
        if users.contains_key(&user.username) {
            return Err(AppError::Conflict(format!(
                "username '{}' is already taken",
                user.username
            )));
        }
        users.insert(user.username.clone(), user);
        Ok(())
    }

    async fn get(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.lock().await.get(username).cloned())
    }

    async fn exists(&self, username: &str) -> Result<bool, AppError> {
        Ok(self.users.lock().await.contains_key(username))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert(&self, session: Session) -> Result<(), AppError> {
        self.sessions
            .lock()
            .await
            .insert(session.token.clone(), session);
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<Session>, AppError> {
        Ok(self.sessions.lock().await.get(token).cloned())
    }

    async fn delete(&self, token: &str) -> Result<(), AppError> {
        self.sessions.lock().await.remove(token);
        Ok(())
    }

    async fn delete_expired(&self, now: i64) -> Result<u64, AppError> {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }

    async fn list_active(&self, now: i64) -> Result<Vec<Session>, AppError> {
        Ok(self
            .sessions
            .lock()
            .await
            .values()
            .filter(|s| !s.is_expired(now))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append(&self, mut message: Message) -> Result<Message, AppError> {
        let mut messages = self.messages.lock().await;
        // Timestamps may collide or regress under a coarse clock; bump to
        // the tail's timestamp so the log stays nondecreasing and ties keep
        // arrival order.
        if let Some(last) = messages.back() {
            if message.created_at < last.created_at {
                message.created_at = last.created_at;
            }
        }
        messages.push_back(message.clone());
        while messages.len() > self.retention_limit {
            messages.pop_front();
        }
        Ok(message)
    }

    async fn list(&self, since: Option<i64>, limit: usize) -> Result<Vec<Message>, AppError> {
        let messages = self.messages.lock().await;
        let mut result: Vec<Message> = match since {
            Some(watermark) => messages
                .iter()
                .filter(|m| m.created_at > watermark)
                .cloned()
                .collect(),
            None => messages.iter().cloned().collect(),
        };
        if result.len() > limit {
            result.drain(..result.len() - limit);
        }
        Ok(result)
    }

    async fn get(&self, id: &str) -> Result<Option<Message>, AppError> {
        Ok(self
            .messages
            .lock()
            .await
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn update(&self, id: &str, patch: MessagePatch) -> Result<Option<Message>, AppError> {
        let mut messages = self.messages.lock().await;
        match messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.content = patch.content;
                message.edited = true;
                message.edited_at = Some(patch.edited_at);
                Ok(Some(message.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let mut messages = self.messages.lock().await;
        match messages.iter().position(|m| m.id == id) {
            Some(index) => {
                messages.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
