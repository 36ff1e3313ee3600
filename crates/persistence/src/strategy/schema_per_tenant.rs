//! Schema-per-tenant store naming.

use serde::{Deserialize, Serialize};

use crate::error::{StorageError, ValidationError};
use crate::tenant::TenantShortName;

/// Configuration for schema-per-tenant tenancy.
///
/// # Example
///
/// ```
/// use stratum_persistence::strategy::SchemaPerTenantConfig;
///
/// let config = SchemaPerTenantConfig {
///     store_prefix: "t_".to_string(),
///     ..Default::default()
/// };
/// assert!(config.drop_on_delete);
/// assert!(!config.with_retain_on_delete().drop_on_delete);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaPerTenantConfig {
    /// Prefix for tenant store names.
    ///
    /// The full store name is `{prefix}{short_name}`.
    #[serde(default = "default_store_prefix")]
    pub store_prefix: String,

    /// Maximum store name length.
    #[serde(default = "default_max_store_name_length")]
    pub max_store_name_length: usize,

    /// Pattern every full store name must match.
    #[serde(default = "default_store_name_pattern")]
    pub store_name_pattern: String,

    /// Whether to destroy the tenant's store when the tenant is deleted.
    ///
    /// When off, the store is moved aside under a `.deleted-<timestamp>`
    /// suffix so a tenant re-added under the same short name starts empty.
    #[serde(default = "default_drop_on_delete")]
    pub drop_on_delete: bool,
}

fn default_store_prefix() -> String {
    "tenant_".to_string()
}

fn default_max_store_name_length() -> usize {
    63
}

fn default_store_name_pattern() -> String {
    r"^[a-z][a-z0-9_]*$".to_string()
}

fn default_drop_on_delete() -> bool {
    true
}

impl Default for SchemaPerTenantConfig {
    fn default() -> Self {
        Self {
            store_prefix: default_store_prefix(),
            max_store_name_length: default_max_store_name_length(),
            store_name_pattern: default_store_name_pattern(),
            drop_on_delete: default_drop_on_delete(),
        }
    }
}

impl SchemaPerTenantConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the store name prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.store_prefix = prefix.into();
        self
    }

    /// Keeps deleted tenants' stores, moved aside, instead of destroying them.
    pub fn with_retain_on_delete(mut self) -> Self {
        self.drop_on_delete = false;
        self
    }
}

/// Maps tenant short names to store names.
#[derive(Debug, Clone)]
pub struct SchemaPerTenantStrategy {
    config: SchemaPerTenantConfig,
    store_name_pattern: regex::Regex,
}

impl SchemaPerTenantStrategy {
    /// Creates a strategy, compiling the configured name pattern.
    pub fn new(config: SchemaPerTenantConfig) -> Result<Self, StorageError> {
        let store_name_pattern = regex::Regex::new(&config.store_name_pattern).map_err(|e| {
            ValidationError::InvalidField {
                field: "store_name_pattern".to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(Self {
            config,
            store_name_pattern,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SchemaPerTenantConfig {
        &self.config
    }

    /// Returns the store name for a tenant, validating it.
    pub fn store_name(&self, short_name: &TenantShortName) -> Result<String, ValidationError> {
        let name = format!("{}{}", self.config.store_prefix, short_name.as_str());
        self.validate_store_name(&name)?;
        Ok(name)
    }

    /// Recovers the short name from a store name carrying this prefix.
    pub fn short_name_of(&self, store_name: &str) -> Option<TenantShortName> {
        store_name
            .strip_prefix(&self.config.store_prefix)
            .and_then(|rest| TenantShortName::new(rest).ok())
    }

    fn validate_store_name(&self, name: &str) -> Result<(), ValidationError> {
        if name.len() > self.config.max_store_name_length {
            return Err(ValidationError::InvalidField {
                field: "store_name".to_string(),
                message: format!(
                    "'{}' exceeds maximum length of {} characters",
                    name, self.config.max_store_name_length
                ),
            });
        }
        if !self.store_name_pattern.is_match(name) {
            return Err(ValidationError::InvalidField {
                field: "store_name".to_string(),
                message: format!(
                    "'{}' does not match required pattern: {}",
                    name, self.config.store_name_pattern
                ),
            });
        }
        Ok(())
    }
}
