use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// Unset means the in-memory backend is used.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub session_ttl_hours: i64,
    pub message_retention_limit: usize,
    pub max_message_length: usize,
    pub min_username_length: usize,
    pub min_password_length: usize,
    pub email_required: bool,
    pub request_timeout_secs: u64,
}

fn parse_env<T: std::str::FromStr>(name: &str, default: &str) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e)))
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Config {
            server_host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: parse_env("SERVER_PORT", "8000")?,
            database_url: std::env::var("DATABASE_URL").ok(),
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", "20")?,
            session_ttl_hours: parse_env("SESSION_TTL_HOURS", "24")?,
            message_retention_limit: parse_env("MESSAGE_RETENTION_LIMIT", "100")?,
            max_message_length: parse_env("MAX_MESSAGE_LENGTH", "2000")?,
            min_username_length: parse_env("MIN_USERNAME_LENGTH", "3")?,
            min_password_length: parse_env("MIN_PASSWORD_LENGTH", "6")?,
            email_required: parse_env("EMAIL_REQUIRED", "false")?,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", "30")?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_host: "127.0.0.1".to_string(),
            server_port: 8000,
            database_url: None,
            db_max_connections: 20,
            session_ttl_hours: 24,
            message_retention_limit: 100,
            max_message_length: 2000,
            min_username_length: 3,
            min_password_length: 6,
            email_required: false,
            request_timeout_secs: 30,
        }
    }
}
