//! Account rows: registration payloads and login lookups.

pub mod entity;
pub mod error;

pub use error::*;
