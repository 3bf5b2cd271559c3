use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::auth::password::{generate_salt, hash_password, verify_password};
use crate::config::Config;
use crate::error::AppError;
use crate::store::models::{now_millis, User};
use crate::store::UserStore;

/// Display colors assigned at registration. Stable for the account's
/// lifetime; messages snapshot the color at send time.
const PALETTE: [&str; 10] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E2",
    "#F8B739", "#52C41A",
];

fn pick_color() -> String {
    PALETTE
        .choose(&mut rand::thread_rng())
        .unwrap_or(&PALETTE[0])
        .to_string()
}

/// Password-credential model over the `users` side of the persistence
/// provider. Validation happens before the uniqueness check; the check and
/// insert themselves are atomic in the provider.
pub struct Credentials {
    users: Arc<dyn UserStore>,
    min_username_length: usize,
    min_password_length: usize,
    email_required: bool,
}

impl Credentials {
    pub fn new(users: Arc<dyn UserStore>, config: &Config) -> Self {
        Self {
            users,
            min_username_length: config.min_username_length,
            min_password_length: config.min_password_length,
            email_required: config.email_required,
        }
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<User, AppError> {
        let username = username.trim();
        if username.chars().count() < self.min_username_length {
            return Err(AppError::Validation(format!(
                "username must be at least {} characters",
                self.min_username_length
            )));
        }
        if password.chars().count() < self.min_password_length {
            return Err(AppError::Validation(format!(
                "password must be at least {} characters",
                self.min_password_length
            )));
        }

        let email = email.map(str::trim).filter(|e| !e.is_empty());
        match email {
            Some(email) if !email.contains('@') => {
                return Err(AppError::Validation("invalid email address".to_string()));
            }
            None if self.email_required => {
                return Err(AppError::Validation("email is required".to_string()));
            }
            _ => {}
        }

        // Early check for a friendlier error; the insert below remains the
        // authoritative, race-free uniqueness guard.
        if self.users.exists(username).await? {
            return Err(AppError::Conflict(format!(
                "username '{}' is already taken",
                username
            )));
        }

        let salt = generate_salt();
        let hash = hash_password(password, &salt)?;

        let user = User {
            username: username.to_string(),
            password_hash: hash.to_vec(),
            password_salt: salt.to_vec(),
            color: pick_color(),
            email: email.map(str::to_string),
            created_at: now_millis(),
        };

        self.users.insert(user.clone()).await?;
        tracing::info!(username = %user.username, "user registered");

        Ok(user)
    }

    /// One generic error for both unknown username and wrong password, so
    /// a caller cannot probe which usernames exist.
    pub async fn verify(&self, username: &str, password: &str) -> Result<User, AppError> {
        let invalid = || AppError::Unauthenticated("invalid username or password".to_string());

        let user = self
            .users
            .get(username.trim())
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(password, &user.password_hash, &user.password_salt)? {
            return Err(invalid());
        }

        Ok(user)
    }

    pub async fn get(&self, username: &str) -> Result<User, AppError> {
        self.users
            .get(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("unknown user '{}'", username)))
    }

    /// Roster lookup that tolerates a missing row instead of failing.
    pub async fn find(&self, username: &str) -> Result<Option<User>, AppError> {
        self.users.get(username).await
    }
}
