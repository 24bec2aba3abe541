//! Order lifecycle: placement payload checks and status advancement.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;
