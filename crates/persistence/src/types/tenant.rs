//! Tenant records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tenant::TenantShortName;

/// A tenant as recorded in the control store.
///
/// The short name selects the tenant's private store. Tenants are immutable
/// once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Stable identifier.
    pub id: Uuid,
    /// Store selector.
    pub short_name: TenantShortName,
    /// Display name.
    pub name: String,
}

impl Tenant {
    /// Creates a tenant record with a fresh identifier.
    pub fn new(short_name: TenantShortName, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            short_name,
            name: name.into(),
        }
    }
}
