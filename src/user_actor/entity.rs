use crate::actor_framework::{ActionOutcome, Entity};
use crate::domain::{User, UserCreate, UserId, UserQuery};

impl Entity for User {
    const KIND: &'static str = "user";
    type Id = UserId;
    type CreatePayload = UserCreate;
    type Patch = ();
    type Query = UserQuery;
    type Action = ();
    type ActionResult = ();

    fn id(&self) -> &UserId { &self.id }

    /// Rejects rows that would be unusable for login.
    fn validate_create(payload: &UserCreate) -> Result<(), String> {
        if payload.name.trim().is_empty() || payload.email.trim().is_empty() {
            return Err("Name and email are required".to_string());
        }
        if payload.password_digest.is_empty() {
            return Err("Password is required".to_string());
        }
        Ok(())
    }

    fn on_update(&mut self, _patch: ()) -> Result<(), String> {
        Ok(())
    }

    fn handle_action(&mut self, _action: ()) -> Result<ActionOutcome<()>, String> {
        Ok(ActionOutcome::unchanged(()))
    }
}
