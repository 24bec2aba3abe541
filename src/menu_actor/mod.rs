//! Menu administration: validation of new and edited menu items.

pub mod entity;
pub mod error;

pub use error::*;
