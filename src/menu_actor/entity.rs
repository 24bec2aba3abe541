use crate::actor_framework::{ActionOutcome, Entity};
use crate::domain::{check_price, MenuItem, MenuItemCreate, MenuItemId, MenuItemPatch, MenuQuery};

impl Entity for MenuItem {
    const KIND: &'static str = "menu item";
    type Id = MenuItemId;
    type CreatePayload = MenuItemCreate;
    type Patch = MenuItemPatch;
    type Query = MenuQuery;
    type Action = ();
    type ActionResult = ();

    fn id(&self) -> &MenuItemId { &self.id }

    fn validate_create(payload: &MenuItemCreate) -> Result<(), String> {
        if payload.name.trim().is_empty() {
            return Err("Name is required".to_string());
        }
        check_price(payload.price)
    }

    /// Applies the provided fields; nothing is changed when any field is invalid.
    ///
    /// # Fields Updated
    /// - `name`: must stay non-empty
    /// - `price`: must stay non-negative
    /// - `available`
    /// - `options`: an empty list clears them
    fn on_update(&mut self, patch: MenuItemPatch) -> Result<(), String> {
        let name = match patch.name {
            Some(name) if name.trim().is_empty() => return Err("Name is required".to_string()),
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };
        if let Some(price) = patch.price {
            check_price(price)?;
            self.price = price;
        }
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(available) = patch.available {
            self.available = available;
        }
        if let Some(options) = patch.options {
            self.options = options;
        }
        Ok(())
    }

    fn handle_action(&mut self, _action: ()) -> Result<ActionOutcome<()>, String> {
        Ok(ActionOutcome::unchanged(()))
    }
}
