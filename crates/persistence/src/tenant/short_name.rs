//! Tenant short name type.
//!
//! This module defines [`TenantShortName`], the validated name that selects a
//! tenant's private store.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum short name length (matches the PostgreSQL identifier limit).
pub const MAX_SHORT_NAME_LEN: usize = 63;

static SHORT_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("short name pattern is valid"));

/// A validated tenant short name.
///
/// Short names start with a lowercase ASCII letter, contain only lowercase
/// letters, digits and underscores, and are at most 63 characters long.
///
/// # Examples
///
/// ```
/// use stratum_persistence::tenant::TenantShortName;
///
/// let name = TenantShortName::new("acme").unwrap();
/// assert_eq!(name.as_str(), "acme");
///
/// assert!(TenantShortName::new("Acme Corp").is_err());
/// assert_eq!(TenantShortName::derive("Acme Corp").unwrap().as_str(), "acme_corp");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantShortName(String);

impl TenantShortName {
    /// Validates and wraps a short name.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.len() > MAX_SHORT_NAME_LEN {
            return Err(ValidationError::InvalidField {
                field: "short_name".to_string(),
                message: format!("exceeds {} characters", MAX_SHORT_NAME_LEN),
            });
        }
        if !SHORT_NAME_PATTERN.is_match(&name) {
            return Err(ValidationError::InvalidField {
                field: "short_name".to_string(),
                message: format!("'{}' must match [a-z][a-z0-9_]*", name),
            });
        }
        Ok(Self(name))
    }

    /// Derives a short name from a display name.
    ///
    /// Lowercases, maps spaces and dashes to underscores and drops anything
    /// else that is not allowed. Fails if nothing usable remains (for example
    /// a purely non-ASCII name).
    pub fn derive(display_name: &str) -> Result<Self, ValidationError> {
        let normalized: String = display_name
            .trim()
            .to_lowercase()
            .replace([' ', '-', '/'], "_")
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        let trimmed = normalized.trim_start_matches(|c: char| !c.is_ascii_lowercase());
        Self::new(trimmed.chars().take(MAX_SHORT_NAME_LEN).collect::<String>())
    }

    /// Returns the short name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TenantShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TenantShortName({})", self.0)
    }
}

impl fmt::Display for TenantShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TenantShortName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TenantShortName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TenantShortName> for String {
    fn from(name: TenantShortName) -> Self {
        name.0
    }
}

impl AsRef<str> for TenantShortName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
