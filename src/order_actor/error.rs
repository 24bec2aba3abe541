use thiserror::Error;
use crate::actor_framework::FrameworkError;
use crate::domain::MenuItemId;
use crate::store::StoreError;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),
    #[error("Choose at least one item")]
    EmptyOrder,
    #[error("Invalid menu item: {0}")]
    InvalidMenuItem(MenuItemId),
    #[error("{0} is not available")]
    Unavailable(String),
    #[error("Please select option for {0}")]
    MissingOption(String),
    #[error("{item} has no option {option:?}")]
    InvalidOption { item: String, option: String },
    #[error("Not allowed: {0}")]
    Forbidden(String),
    #[error("Order validation error: {0}")]
    ValidationError(String),
    #[error("Order database error: {0}")]
    DatabaseError(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for OrderError {
    fn from(err: FrameworkError) -> Self {
        match err {
            FrameworkError::NotFound(_, id) => OrderError::NotFound(id),
            FrameworkError::Rejected(reason) => OrderError::ValidationError(reason),
            FrameworkError::Store(StoreError::NotFound(msg)) => OrderError::NotFound(msg),
            FrameworkError::Store(e) => OrderError::DatabaseError(e.to_string()),
            e @ (FrameworkError::ActorClosed | FrameworkError::ActorDropped) => {
                OrderError::ActorCommunicationError(e.to_string())
            }
        }
    }
}
