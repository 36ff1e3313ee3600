//! User rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user row in a tenant store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identifier.
    pub id: Uuid,
    /// Display name, unique within the tenant.
    pub name: String,
    /// Email address, unique within the tenant.
    pub email: String,
    /// One-way password digest. `None` until an invited user signs up.
    #[serde(skip_serializing)]
    pub password_digest: Option<String>,
    /// Whether the user may sign in.
    pub enabled: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Values for inserting a new user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Optional initial password digest.
    pub password_digest: Option<String>,
    /// Initial enabled flag.
    pub enabled: bool,
}

impl NewUser {
    /// Creates an enabled user with no password.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password_digest: None,
            enabled: true,
        }
    }

    /// Sets the initial password digest.
    pub fn with_password_digest(mut self, digest: impl Into<String>) -> Self {
        self.password_digest = Some(digest.into());
        self
    }

    /// Creates the user disabled.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
