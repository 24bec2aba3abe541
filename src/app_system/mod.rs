//! System orchestration, startup, and shutdown logic.

pub mod kitchen_system;
pub mod tracing;
pub mod error;

pub use self::kitchen_system::*;
pub use self::tracing::*;
pub use self::error::*;
