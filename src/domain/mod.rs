pub mod user;
pub mod menu_item;
pub mod order;

pub use user::*;
pub use menu_item::*;
pub use order::*;
