//! Storage backends behind the entity actors.
//!
//! [`PgStore`] talks to the external PostgreSQL schema; [`MemoryStore`] keeps the
//! same four tables in process with the same constraints.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Row not found: {0}")]
    NotFound(String),
    /// Unique key clash, or a delete blocked by referencing rows.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// A write referenced a row that does not exist.
    #[error("Integrity violation: {0}")]
    Integrity(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Unique clashes are conflicts; broken references and failed checks are integrity
/// violations. A delete blocked by referencing rows is classified where the delete runs.
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound(err.to_string()),
            sqlx::Error::Database(db) => match db.kind() {
                ErrorKind::UniqueViolation => StoreError::Conflict(db.message().to_string()),
                ErrorKind::ForeignKeyViolation | ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                    StoreError::Integrity(db.message().to_string())
                }
                _ => StoreError::Backend(err.to_string()),
            },
            _ => StoreError::Backend(err.to_string()),
        }
    }
}
