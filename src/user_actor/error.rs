use thiserror::Error;
use crate::actor_framework::FrameworkError;
use crate::store::StoreError;

/// Errors that can occur during account operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(String),
    #[error("User already exists: {0}")]
    AlreadyExists(String),
    #[error("User validation error: {0}")]
    ValidationError(String),
    #[error("Invalid login")]
    InvalidCredentials,
    #[error("Not allowed: {0}")]
    Forbidden(String),
    #[error("User database error: {0}")]
    DatabaseError(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for UserError {
    fn from(err: FrameworkError) -> Self {
        match err {
            FrameworkError::NotFound(_, id) => UserError::NotFound(id),
            FrameworkError::Rejected(reason) => UserError::ValidationError(reason),
            FrameworkError::Store(StoreError::Conflict(msg)) => UserError::AlreadyExists(msg),
            FrameworkError::Store(e) => UserError::DatabaseError(e.to_string()),
            e @ (FrameworkError::ActorClosed | FrameworkError::ActorDropped) => {
                UserError::ActorCommunicationError(e.to_string())
            }
        }
    }
}
