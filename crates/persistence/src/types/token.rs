//! Single-use URL tokens sent by email.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// What a URL token authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenKind {
    /// Complete signup for an invited user.
    SignupInvite,
    /// Reset a forgotten password.
    PasswordReset,
}

impl TokenKind {
    /// Returns the stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::SignupInvite => "signup-invite",
            TokenKind::PasswordReset => "password-reset",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signup-invite" => Ok(TokenKind::SignupInvite),
            "password-reset" => Ok(TokenKind::PasswordReset),
            other => Err(ValidationError::InvalidField {
                field: "token kind".to_string(),
                message: format!("unknown kind '{}'", other),
            }),
        }
    }
}

/// A token scoped to one user, persisted in the tenant store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlToken {
    /// Token value embedded in the emailed link.
    pub id: Uuid,
    /// The user the token is scoped to.
    pub user_id: Uuid,
    /// What the token authorizes.
    pub kind: TokenKind,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
    /// Whether the token has been used.
    pub consumed: bool,
}

impl UrlToken {
    /// Issues a fresh token for `user_id` valid for `ttl`.
    pub fn issue(user_id: Uuid, kind: TokenKind, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            expires_at: Utc::now() + ttl,
            consumed: false,
        }
    }

    /// Returns `true` if the token is past its expiry.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_sets_expiry() {
        let token = UrlToken::issue(Uuid::new_v4(), TokenKind::SignupInvite, Duration::hours(1));
        assert!(!token.is_expired());
        assert!(!token.consumed);

        let stale = UrlToken::issue(Uuid::new_v4(), TokenKind::PasswordReset, Duration::seconds(-1));
        assert!(stale.is_expired());
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(
            "password-reset".parse::<TokenKind>().unwrap(),
            TokenKind::PasswordReset
        );
        assert!("magic-link".parse::<TokenKind>().is_err());
    }
}
