use std::sync::Arc;

use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::store::models::{now_millis, Message, MessagePatch, User};
use crate::store::MessageStore;

/// Message log operations: append with content validation, watermark
/// listing, and owner-only edit/delete. The retention cap itself lives in
/// the provider, atomic with append.
pub struct Messages {
    store: Arc<dyn MessageStore>,
    max_message_length: usize,
    retention_limit: usize,
}

impl Messages {
    pub fn new(store: Arc<dyn MessageStore>, config: &Config) -> Self {
        Self {
            store,
            max_message_length: config.max_message_length,
            retention_limit: config.message_retention_limit,
        }
    }

    fn validate_content<'a>(&self, content: &'a str) -> Result<&'a str, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation(
                "message content is required".to_string(),
            ));
        }
        if content.chars().count() > self.max_message_length {
            return Err(AppError::Validation(format!(
                "message exceeds {} characters",
                self.max_message_length
            )));
        }
        Ok(content)
    }

    /// Append a new message authored by `author`, snapshotting their
    /// current display color.
    pub async fn send(&self, author: &User, content: &str) -> Result<Message, AppError> {
        let content = self.validate_content(content)?;

        let message = Message {
            id: Uuid::new_v4().to_string(),
            username: author.username.clone(),
            content: content.to_string(),
            color: author.color.clone(),
            created_at: now_millis(),
            edited: false,
            edited_at: None,
        };

        self.store.append(message).await
    }

    /// Retained messages oldest-first. `since` is the client's watermark:
    /// only strictly newer messages are returned, so polling never delivers
    /// a message twice. Accepts unix milliseconds or an RFC 3339 timestamp.
    pub async fn list(&self, since: Option<&str>) -> Result<Vec<Message>, AppError> {
        let since = since.map(parse_watermark).transpose()?;
        self.store.list(since, self.retention_limit).await
    }

    pub async fn get(&self, id: &str) -> Result<Message, AppError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("unknown message '{}'", id)))
    }

    pub async fn edit(
        &self,
        id: &str,
        content: &str,
        requester: &str,
    ) -> Result<Message, AppError> {
        let content = self.validate_content(content)?;

        let existing = self.get(id).await?;
        if existing.username != requester {
            return Err(AppError::Forbidden(
                "you can only edit your own messages".to_string(),
            ));
        }

        self.store
            .update(
                id,
                MessagePatch {
                    content: content.to_string(),
                    edited_at: now_millis(),
                },
            )
            .await?
            .ok_or_else(|| AppError::NotFound(format!("unknown message '{}'", id)))
    }

    pub async fn delete(&self, id: &str, requester: &str) -> Result<(), AppError> {
        let existing = self.get(id).await?;
        if existing.username != requester {
            return Err(AppError::Forbidden(
                "you can only delete your own messages".to_string(),
            ));
        }

        if !self.store.delete(id).await? {
            return Err(AppError::NotFound(format!("unknown message '{}'", id)));
        }
        Ok(())
    }
}

fn parse_watermark(raw: &str) -> Result<i64, AppError> {
    if let Ok(millis) = raw.parse::<i64>() {
        return Ok(millis);
    }
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.timestamp_millis())
        .map_err(|_| AppError::Validation(format!("invalid 'since' timestamp: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn messages(config: &Config) -> Messages {
        Messages::new(Arc::new(MemoryStore::new(config.message_retention_limit)), config)
    }

    fn author(name: &str, color: &str) -> User {
        User {
            username: name.to_string(),
            password_hash: vec![0; 32],
            password_salt: vec![0; 32],
            color: color.to_string(),
            email: None,
            created_at: now_millis(),
        }
    }

    #[tokio::test]
    async fn test_send_snapshots_author_color() {
        let messages = messages(&Config::default());
        let sent = messages
            .send(&author("alice", "#FF6B6B"), "  hi  ")
            .await
            .unwrap();
        assert_eq!(sent.content, "hi");
        assert_eq!(sent.color, "#FF6B6B");
        assert_eq!(sent.username, "alice");
        assert!(!sent.edited);
        assert!(sent.edited_at.is_none());
    }

    #[tokio::test]
    async fn test_send_rejects_empty_and_oversized() {
        let config = Config {
            max_message_length: 10,
            ..Config::default()
        };
        let messages = messages(&config);
        let alice = author("alice", "#FF6B6B");

        let err = messages.send(&alice, "   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = messages.send(&alice, "0123456789ab").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_watermark_parsing() {
        let messages = messages(&Config::default());

        messages.list(Some("1700000000000")).await.unwrap();
        messages
            .list(Some("2024-01-15T12:00:00+00:00"))
            .await
            .unwrap();

        let err = messages.list(Some("yesterday")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_edit_enforces_ownership() {
        let messages = messages(&Config::default());
        let sent = messages
            .send(&author("alice", "#FF6B6B"), "original")
            .await
            .unwrap();

        let err = messages.edit(&sent.id, "hijacked", "bob").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        // The failed edit leaves the message unchanged.
        let unchanged = messages.get(&sent.id).await.unwrap();
        assert_eq!(unchanged.content, "original");
        assert!(!unchanged.edited);

        let edited = messages.edit(&sent.id, "fixed", "alice").await.unwrap();
        assert_eq!(edited.content, "fixed");
        assert!(edited.edited);
        assert!(edited.edited_at.is_some());
    }

    #[tokio::test]
    async fn test_delete_enforces_ownership() {
        let messages = messages(&Config::default());
        let sent = messages
            .send(&author("alice", "#FF6B6B"), "to delete")
            .await
            .unwrap();

        let err = messages.delete(&sent.id, "bob").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        messages.delete(&sent.id, "alice").await.unwrap();
        let err = messages.get(&sent.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let messages = messages(&Config::default());
        let err = messages.edit("missing", "content", "alice").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = messages.delete("missing", "alice").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
