//! SQLite backend over an sqlx connection pool.

use async_trait::async_trait;
use sqlx::{Pool, Sqlite};

use crate::error::AppError;
use crate::store::models::{Message, MessagePatch, Session, User};
use crate::store::{MessageStore, SessionStore, UserStore};

pub struct SqliteStore {
    pool: Pool<Sqlite>,
    retention_limit: usize,
}

impl SqliteStore {
    pub fn new(pool: Pool<Sqlite>, retention_limit: usize) -> Self {
        Self {
            pool,
            retention_limit,
        }
    }
}

/// Pool exhaustion, lost connections and failed queries all surface as
/// `Storage`; the caller sees the failure instead of stale data.
fn storage_error(err: sqlx::Error) -> AppError {
    AppError::Storage(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation
    )
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn insert(&self, user: User) -> Result<(), AppError> {
        sqlx::query(
            r#"
INSERT INTO users (username, password_hash, password_salt, color, email, created_at)
VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.password_salt)
        .bind(&user.color)
        .bind(&user.email)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("username '{}' is already taken", user.username))
            } else {
                storage_error(e)
            }
        })?;

        Ok(())
    }

    async fn get(&self, username: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)
    }

    async fn exists(&self, username: &str) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(count > 0)
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn insert(&self, session: Session) -> Result<(), AppError> {
        sqlx::query(
            r#"
INSERT INTO sessions (token, username, created_at, expires_at)
VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&session.token)
        .bind(&session.username)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<Session>, AppError> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)
    }

    async fn delete(&self, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(())
    }

    async fn delete_expired(&self, now: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(result.rows_affected())
    }

    async fn list_active(&self, now: i64) -> Result<Vec<Session>, AppError> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE expires_at > ?")
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn append(&self, mut message: Message) -> Result<Message, AppError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        // Keep the log nondecreasing under a coarse or stepping clock;
        // rowid breaks remaining ties by arrival order.
        let tail: Option<i64> = sqlx::query_scalar("SELECT MAX(created_at) FROM messages")
            .fetch_one(&mut *tx)
            .await
            .map_err(storage_error)?;
        if let Some(tail) = tail {
            if message.created_at < tail {
                message.created_at = tail;
            }
        }

        sqlx::query(
            r#"
INSERT INTO messages (id, username, content, color, created_at, edited, edited_at)
VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.id)
        .bind(&message.username)
        .bind(&message.content)
        .bind(&message.color)
        .bind(message.created_at)
        .bind(message.edited)
        .bind(message.edited_at)
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        sqlx::query(
            r#"
DELETE FROM messages WHERE rowid NOT IN (
    SELECT rowid FROM messages ORDER BY created_at DESC, rowid DESC LIMIT ?
)
            "#,
        )
        .bind(self.retention_limit as i64)
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;

        Ok(message)
    }

    async fn list(&self, since: Option<i64>, limit: usize) -> Result<Vec<Message>, AppError> {
        let limit = limit.min(i64::MAX as usize) as i64;

        // Page newest-first so LIMIT keeps the most recent entries, then
        // reverse in memory; rowid is only addressable on the base table.
        let query = match since {
            Some(watermark) => sqlx::query_as::<_, Message>(
                r#"
SELECT * FROM messages WHERE created_at > ?
ORDER BY created_at DESC, rowid DESC LIMIT ?
                "#,
            )
            .bind(watermark)
            .bind(limit),
            None => sqlx::query_as::<_, Message>(
                "SELECT * FROM messages ORDER BY created_at DESC, rowid DESC LIMIT ?",
            )
            .bind(limit),
        };

        let mut messages = query.fetch_all(&self.pool).await.map_err(storage_error)?;
        messages.reverse();
        Ok(messages)
    }

    async fn get(&self, id: &str) -> Result<Option<Message>, AppError> {
        sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)
    }

    async fn update(&self, id: &str, patch: MessagePatch) -> Result<Option<Message>, AppError> {
        let result = sqlx::query(
            "UPDATE messages SET content = ?, edited = 1, edited_at = ? WHERE id = ?",
        )
        .bind(&patch.content)
        .bind(patch.edited_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        MessageStore::get(self, id).await
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(result.rows_affected() > 0)
    }
}
