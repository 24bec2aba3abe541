use thiserror::Error;

/// Failures while bringing the system up or down.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Actor task failed: {0}")]
    TaskFailed(String),
}
