//! Caller identity carried with an inbound call.
//!
//! [`CallIdentity`] is populated once by the transport/authentication layer
//! and passed explicitly into every operation. Identifiers are parsed at
//! construction so that operations never see a malformed id.

use uuid::Uuid;

use crate::error::{TenantError, ValidationError};

/// The authenticated caller's identifiers.
///
/// # Examples
///
/// ```
/// use stratum_persistence::tenant::CallIdentity;
/// use uuid::Uuid;
///
/// let tenant = Uuid::new_v4();
/// let user = Uuid::new_v4();
/// let identity = CallIdentity::parse(&tenant.to_string(), &user.to_string(), "sess-1")
///     .unwrap()
///     .with_acting_as("ops@acme.io");
///
/// assert_eq!(identity.tenant_id(), tenant);
/// assert_eq!(identity.acting_as(), Some("ops@acme.io"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallIdentity {
    tenant_id: Uuid,
    user_id: Uuid,
    session_id: String,
    acting_as: Option<String>,
}

impl CallIdentity {
    /// Creates an identity from already-parsed identifiers.
    pub fn new(tenant_id: Uuid, user_id: Uuid, session_id: impl Into<String>) -> Self {
        Self {
            tenant_id,
            user_id,
            session_id: session_id.into(),
            acting_as: None,
        }
    }

    /// Parses an identity from the raw claim strings.
    ///
    /// A malformed tenant id yields [`TenantError::InvalidTenantId`]; a
    /// malformed user id or an empty session id yields a validation error.
    pub fn parse(
        tenant_id: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Self, crate::error::StorageError> {
        let tenant_id = Uuid::parse_str(tenant_id.trim()).map_err(|_| {
            TenantError::InvalidTenantId {
                value: tenant_id.to_string(),
            }
        })?;
        let user_id =
            Uuid::parse_str(user_id.trim()).map_err(|_| ValidationError::InvalidField {
                field: "user_id".to_string(),
                message: format!("'{}' is not a UUID", user_id),
            })?;
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(ValidationError::MissingRequiredField {
                field: "session_id".to_string(),
            }
            .into());
        }
        Ok(Self::new(tenant_id, user_id, session_id))
    }

    /// Records who the caller is acting as, for auditing.
    pub fn with_acting_as(mut self, acting_as: impl Into<String>) -> Self {
        let acting_as = acting_as.into();
        self.acting_as = if acting_as.is_empty() {
            None
        } else {
            Some(acting_as)
        };
        self
    }

    /// Returns the tenant identifier.
    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    /// Returns the calling user's identifier.
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Returns the caller's session identifier.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Returns the "acting as" identity, if any.
    pub fn acting_as(&self) -> Option<&str> {
        self.acting_as.as_deref()
    }
}
