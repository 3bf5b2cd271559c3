use std::sync::Arc;

use crate::auth::sessions::SessionManager;
use crate::error::AppError;

/// Request-time guard in front of every protected operation: resolves a
/// bearer token to a username, or fails with a 401-class error.
pub struct AuthGateway {
    sessions: Arc<SessionManager>,
}

impl AuthGateway {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }

    pub async fn authenticate(&self, token: Option<&str>) -> Result<String, AppError> {
        let token = token
            .ok_or_else(|| AppError::Unauthenticated("missing bearer token".to_string()))?;
        self.sessions.resolve(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn test_missing_token_rejected() {
        let store = Arc::new(MemoryStore::new(100));
        let sessions = Arc::new(SessionManager::new(store, 24));
        let gateway = AuthGateway::new(sessions.clone());

        let err = gateway.authenticate(None).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));

        let session = sessions.create("alice").await.unwrap();
        let username = gateway.authenticate(Some(&session.token)).await.unwrap();
        assert_eq!(username, "alice");
    }
}
