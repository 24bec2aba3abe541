use crate::domain::{OrderStatus, RecordedStatus};

/// Custom actions for Order entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    /// Moves the order one step along the lifecycle.
    Advance,
}

/// Results from OrderActions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderActionResult {
    Advanced { from: OrderStatus, to: OrderStatus },
    /// The order is completed or carries a status outside the lifecycle; nothing was written.
    NoTransition(RecordedStatus),
}
