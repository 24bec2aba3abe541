use thiserror::Error;
use crate::actor_framework::FrameworkError;
use crate::store::StoreError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MenuError {
    #[error("Menu item not found: {0}")]
    NotFound(String),
    #[error("Menu validation error: {0}")]
    ValidationError(String),
    #[error("Not allowed: {0}")]
    Forbidden(String),
    #[error("Menu item is referenced by placed orders: {0}")]
    InUse(String),
    #[error("Menu database error: {0}")]
    DatabaseError(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for MenuError {
    fn from(err: FrameworkError) -> Self {
        match err {
            FrameworkError::NotFound(_, id) => MenuError::NotFound(id),
            FrameworkError::Rejected(reason) => MenuError::ValidationError(reason),
            FrameworkError::Store(StoreError::Conflict(msg)) => MenuError::InUse(msg),
            FrameworkError::Store(e) => MenuError::DatabaseError(e.to_string()),
            e @ (FrameworkError::ActorClosed | FrameworkError::ActorDropped) => {
                MenuError::ActorCommunicationError(e.to_string())
            }
        }
    }
}
