//! Tenant administration.
//!
//! Used by the command line. These operations work on a context with no
//! tenant bound and do not go through caller identity resolution.

use stratum_persistence::error::{ResourceError, StorageError, StorageResult, TenantError};
use stratum_persistence::types::Tenant;
use stratum_persistence::{CallSignal, IdentityResolver, TenantShortName};
use tracing::{info, warn};

/// Creates, lists and deletes tenants.
#[derive(Debug, Clone)]
pub struct TenantAdmin {
    resolver: IdentityResolver,
}

impl TenantAdmin {
    /// Creates an admin over the resolver's store provider.
    pub fn new(resolver: IdentityResolver) -> Self {
        Self { resolver }
    }

    /// Records a tenant in the control store and provisions its store.
    ///
    /// The short name is derived from `name` when not given.
    pub async fn add_tenant(
        &self,
        name: &str,
        short_name: Option<&str>,
        signal: CallSignal,
    ) -> StorageResult<Tenant> {
        let short_name = match short_name {
            Some(s) => TenantShortName::new(s)?,
            None => TenantShortName::derive(name)?,
        };
        let tenant = Tenant::new(short_name.clone(), name.trim());
        let provider = self.resolver.provider().clone();

        let mut guard = self.resolver.empty_context(signal).guard();
        let result = async {
            let tx = guard.control_tx().await?;
            if tx.tenant_by_short_name(&short_name).await?.is_some() {
                return Err(StorageError::from(ResourceError::AlreadyExists {
                    kind: "tenant",
                    key: short_name.to_string(),
                }));
            }
            tx.insert_tenant(&tenant).await?;
            provider.provision_tenant_store(&short_name).await?;
            Ok::<_, StorageError>(())
        }
        .await;
        let provisioned = result.is_ok();

        if let Err(err) = guard.finish(result).await {
            if provisioned {
                if let Err(cleanup) = provider.remove_tenant_store(&short_name).await {
                    warn!(tenant = short_name.as_str(), error = %cleanup, "failed to remove store of uncommitted tenant");
                }
            }
            return Err(err);
        }

        info!(tenant = short_name.as_str(), tenant_id = %tenant.id, "tenant added");
        Ok(tenant)
    }

    /// Deletes a tenant's control row, then removes its store.
    pub async fn delete_tenant(&self, short_name: &str, signal: CallSignal) -> StorageResult<()> {
        let short_name = TenantShortName::new(short_name.trim())?;

        let mut guard = self.resolver.empty_context(signal).guard();
        let result = async {
            let tx = guard.control_tx().await?;
            let tenant = tx.tenant_by_short_name(&short_name).await?.ok_or_else(|| {
                TenantError::NotFound {
                    tenant_id: short_name.to_string(),
                }
            })?;
            tx.delete_tenant(tenant.id).await?;
            Ok::<_, StorageError>(tenant)
        }
        .await;
        let tenant = guard.finish(result).await?;

        self.resolver
            .provider()
            .remove_tenant_store(&short_name)
            .await?;
        info!(tenant = short_name.as_str(), tenant_id = %tenant.id, "tenant deleted");
        Ok(())
    }

    /// Lists all tenants.
    pub async fn list_tenants(&self, signal: CallSignal) -> StorageResult<Vec<Tenant>> {
        self.resolver.provider().control().list_tenants(&signal).await
    }
}
