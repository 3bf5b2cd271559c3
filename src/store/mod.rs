//! Persistence provider contract and its backends.
//!
//! The service core only speaks to these traits; the in-memory and SQLite
//! backends are interchangeable. A backend signals an unreachable or failed
//! store with `AppError::Storage` rather than degrading silently.

pub mod memory;
pub mod models;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::AppError;
use models::{Message, MessagePatch, Session, User};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert-if-absent. Fails with `Conflict` when the username is taken;
    /// the check and insert are atomic with respect to concurrent calls.
    async fn insert(&self, user: User) -> Result<(), AppError>;

    async fn get(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn exists(&self, username: &str) -> Result<bool, AppError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: Session) -> Result<(), AppError>;

    async fn get(&self, token: &str) -> Result<Option<Session>, AppError>;

    /// Idempotent; deleting an absent token is not an error.
    async fn delete(&self, token: &str) -> Result<(), AppError>;

    /// Garbage-collect sessions with `expires_at <= now`. Returns the count.
    async fn delete_expired(&self, now: i64) -> Result<u64, AppError>;

    /// Sessions with `expires_at > now`, unordered, possibly several per user.
    async fn list_active(&self, now: i64) -> Result<Vec<Session>, AppError>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append at the tail, then evict oldest entries past the retention cap.
    /// Both steps happen under one critical section (or transaction) so the
    /// cap holds under concurrent appends. The stored message is returned;
    /// its `created_at` may have been bumped to keep ordering monotonic.
    async fn append(&self, message: Message) -> Result<Message, AppError>;

    /// Oldest-first. With `since`, only messages with `created_at` strictly
    /// greater than the watermark are returned.
    async fn list(&self, since: Option<i64>, limit: usize) -> Result<Vec<Message>, AppError>;

    async fn get(&self, id: &str) -> Result<Option<Message>, AppError>;

    /// Returns the updated message, or `None` when the id is unknown.
    async fn update(&self, id: &str, patch: MessagePatch) -> Result<Option<Message>, AppError>;

    /// Returns whether a message was deleted.
    async fn delete(&self, id: &str) -> Result<bool, AppError>;
}
