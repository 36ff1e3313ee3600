//! Caller sessions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Session validity.
///
/// A session moves from `Valid` to `Invalid` once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// The session may be used.
    Valid,
    /// The session has been revoked.
    Invalid,
}

impl SessionStatus {
    /// Returns the stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Valid => "valid",
            SessionStatus::Invalid => "invalid",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "valid" => Ok(SessionStatus::Valid),
            "invalid" => Ok(SessionStatus::Invalid),
            other => Err(ValidationError::InvalidField {
                field: "session status".to_string(),
                message: format!("unknown status '{}'", other),
            }),
        }
    }
}

/// A session row in a tenant store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier issued by the authentication layer.
    pub id: String,
    /// The user the session belongs to.
    pub user_id: Uuid,
    /// Current validity.
    pub status: SessionStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Creates a valid session for `user_id`.
    pub fn new(id: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            id: id.into(),
            user_id,
            status: SessionStatus::Valid,
            created_at: Utc::now(),
        }
    }
}
