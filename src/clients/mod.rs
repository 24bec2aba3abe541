//! Typed clients over the entity actors.

#[macro_use]
mod macros;
pub mod user_client;
pub mod menu_client;
pub mod order_client;

pub use user_client::*;
pub use menu_client::*;
pub use order_client::*;
