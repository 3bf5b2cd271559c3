use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flowchat_server::{
    api::{create_router, AppState},
    chat::ChatService,
    config::Config,
    error::AppError,
    store::{memory::MemoryStore, sqlite::SqliteStore, MessageStore, SessionStore, UserStore},
};

type Stores = (
    Arc<dyn UserStore>,
    Arc<dyn SessionStore>,
    Arc<dyn MessageStore>,
);

async fn build_stores(config: &Config) -> Result<Stores, AppError> {
    match &config.database_url {
        Some(url) => {
            let pool = SqlitePoolOptions::new()
                .max_connections(config.db_max_connections)
                .acquire_timeout(Duration::from_secs(30))
                .connect(url)
                .await
                .map_err(|e| AppError::Storage(format!("database connect failed: {}", e)))?;

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| AppError::Internal(format!("migration failed: {}", e)))?;

            tracing::info!("database connected: {}", url);
            let store = Arc::new(SqliteStore::new(pool, config.message_retention_limit));
            Ok((store.clone(), store.clone(), store))
        }
        None => {
            tracing::info!("no DATABASE_URL set, using in-memory storage");
            let store = Arc::new(MemoryStore::new(config.message_retention_limit));
            Ok((store.clone(), store.clone(), store))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,flowchat_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting flowchat server v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    tracing::info!("configuration loaded");

    let (users, sessions, messages) = build_stores(&config).await?;
    let service = Arc::new(ChatService::new(users, sessions, messages, &config));

    // Hourly sweep of expired sessions; resolve also drops them lazily.
    {
        let service = service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(3600));
            loop {
                interval.tick().await;
                match service.sweep_sessions().await {
                    Ok(swept) => tracing::debug!(swept, "expired sessions cleaned up"),
                    Err(e) => tracing::error!("session cleanup failed: {}", e),
                }
            }
        });
    }

    let state = AppState { service };
    let app = create_router(state, Duration::from_secs(config.request_timeout_secs));

    let addr = config.server_address();
    tracing::info!("server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Internal(format!("server error: {}", e)))?;

    Ok(())
}
