use std::fmt;
use sha2::{Digest, Sha256};

pub type UserId = i64;

/// Account role. Anything the store holds other than `ADMIN` is a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Customer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("ADMIN") {
            Role::Admin
        } else {
            Role::Customer
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a registered user in the system.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_digest: String,
    pub role: Role,
}

impl User {
    pub fn verify_password(&self, password: &str) -> bool {
        self.password_digest == password_digest(&self.email, password)
    }
}

/// Payload for creating a new user row.
#[derive(Debug, Clone)]
pub struct UserCreate {
    pub name: String,
    pub email: String,
    pub password_digest: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub enum UserQuery {
    ByEmail(String),
}

/// Self-service sign-up form. New accounts are always customers.
#[derive(Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl Registration {
    pub fn new(name: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    /// Trims the form, checks every field is present and hashes the password.
    pub fn into_create(self) -> Result<UserCreate, String> {
        let name = self.name.trim();
        let email = normalize_email(&self.email);
        let password = self.password.trim();
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err("All fields are required".to_string());
        }
        Ok(UserCreate {
            name: name.to_string(),
            password_digest: password_digest(&email, password),
            email,
            role: Role::Customer,
        })
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// A logged-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: UserId,
    pub name: String,
    pub role: Role,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails with a readable reason unless this is a staff session.
    pub fn require_admin(&self, operation: &str) -> Result<(), String> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(format!("{} may not {}", self.name, operation))
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hex SHA-256 of `email:password`, with the email normalized first.
pub fn password_digest(email: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_email(email).as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
