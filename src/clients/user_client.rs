use tracing::{debug, info, instrument, warn};
use crate::domain::{normalize_email, Credentials, Registration, Session, User, UserId, UserQuery};
use crate::user_actor::UserError;
use crate::actor_framework::ResourceClient;

/// Client for interacting with the User actor.
#[derive(Clone)]
pub struct UserClient {
    inner: ResourceClient<User>,
}

impl_basic_client!(UserClient, User, UserError, user);

impl UserClient {
    /// Creates a customer account. The form is checked before the actor is asked.
    #[instrument(skip(self))]
    pub async fn register(&self, registration: Registration) -> Result<UserId, UserError> {
        debug!("Sending request");
        let payload = registration.into_create().map_err(UserError::ValidationError)?;
        let id = self.inner.create(payload).await?;
        info!(user_id = id, "Customer registered");
        Ok(id)
    }

    #[instrument(skip(self))]
    pub async fn login(&self, credentials: Credentials) -> Result<Session, UserError> {
        let email = normalize_email(&credentials.email);
        let password = credentials.password.trim();
        if email.is_empty() || password.is_empty() {
            return Err(UserError::ValidationError("Enter both email and password".to_string()));
        }

        debug!("Sending request");
        let user = self.inner.find(UserQuery::ByEmail(email)).await?.into_iter().next();
        match user {
            Some(user) if user.verify_password(password) => {
                info!(user_id = user.id, role = %user.role, "Login accepted");
                Ok(Session {
                    user_id: user.id,
                    name: user.name,
                    role: user.role,
                })
            }
            _ => {
                warn!("Login rejected");
                Err(UserError::InvalidCredentials)
            }
        }
    }
}
