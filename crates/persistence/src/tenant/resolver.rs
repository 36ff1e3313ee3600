//! Resolves a caller's identity to its tenant.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::context::TxContext;
use crate::core::{CallSignal, StoreProvider};
use crate::error::{StorageResult, TenantError};
use crate::types::Tenant;

use super::CallIdentity;

/// Looks up tenants in the control store and builds call contexts.
#[derive(Clone)]
pub struct IdentityResolver {
    provider: Arc<dyn StoreProvider>,
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver").finish_non_exhaustive()
    }
}

impl IdentityResolver {
    /// Creates a resolver over `provider`.
    pub fn new(provider: Arc<dyn StoreProvider>) -> Self {
        Self { provider }
    }

    /// Returns the store provider.
    pub fn provider(&self) -> &Arc<dyn StoreProvider> {
        &self.provider
    }

    /// Resolves the caller's tenant record.
    ///
    /// # Errors
    ///
    /// `TenantError::NotFound` if the control store has no such tenant, or
    /// the underlying store error if the lookup itself fails.
    pub async fn resolve(&self, identity: &CallIdentity, signal: &CallSignal) -> StorageResult<Tenant> {
        signal.check()?;
        let tenant_id = identity.tenant_id();
        let tenant = self
            .provider
            .control()
            .tenant_by_id(tenant_id, signal)
            .await
            .inspect_err(|e| warn!(tenant_id = %tenant_id, error = %e, "tenant lookup failed"))?;

        match tenant {
            Some(tenant) => {
                debug!(tenant_id = %tenant_id, tenant = tenant.short_name.as_str(), "resolved tenant");
                Ok(tenant)
            }
            None => Err(TenantError::NotFound {
                tenant_id: tenant_id.to_string(),
            }
            .into()),
        }
    }

    /// Resolves the caller's tenant and returns a context bound to it and
    /// to `signal`.
    pub async fn context_for(&self, identity: &CallIdentity, signal: CallSignal) -> StorageResult<TxContext> {
        let tenant = self.resolve(identity, &signal).await?;
        Ok(TxContext::new(Arc::clone(&self.provider), Some(tenant), signal)
            .with_acting_as(identity.acting_as().map(str::to_string)))
    }

    /// Returns a context with no tenant bound.
    pub fn empty_context(&self, signal: CallSignal) -> TxContext {
        TxContext::new(Arc::clone(&self.provider), None, signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::sqlite::SqliteProvider;
    use crate::error::StorageError;
    use crate::tenant::TenantShortName;
    use uuid::Uuid;

    async fn resolver_with_acme() -> (IdentityResolver, Tenant) {
        let resolver = IdentityResolver::new(Arc::new(SqliteProvider::in_memory().unwrap()));
        let tenant = Tenant::new(TenantShortName::new("acme").unwrap(), "Acme");
        let mut ctx = resolver.empty_context(CallSignal::new());
        ctx.control_tx().await.unwrap().insert_tenant(&tenant).await.unwrap();
        ctx.commit().await.unwrap();
        (resolver, tenant)
    }

    #[tokio::test]
    async fn test_resolve_known_tenant() {
        let (resolver, tenant) = resolver_with_acme().await;
        let identity = CallIdentity::new(tenant.id, Uuid::new_v4(), "s1");
        let resolved = resolver.resolve(&identity, &CallSignal::new()).await.unwrap();
        assert_eq!(resolved, tenant);
    }

    #[tokio::test]
    async fn test_resolve_unknown_tenant() {
        let (resolver, _) = resolver_with_acme().await;
        let identity = CallIdentity::new(Uuid::new_v4(), Uuid::new_v4(), "s1");
        let err = resolver.resolve(&identity, &CallSignal::new()).await.unwrap_err();
        assert!(matches!(err, StorageError::Tenant(TenantError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_resolve_observes_cancellation() {
        let (resolver, tenant) = resolver_with_acme().await;
        let identity = CallIdentity::new(tenant.id, Uuid::new_v4(), "s1");
        let signal = CallSignal::new();
        signal.cancel();
        assert!(resolver.resolve(&identity, &signal).await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_context_for_binds_tenant_and_acting_as() {
        let (resolver, tenant) = resolver_with_acme().await;
        let identity = CallIdentity::new(tenant.id, Uuid::new_v4(), "s1").with_acting_as("ops");
        let ctx = resolver.context_for(&identity, CallSignal::new()).await.unwrap();
        assert_eq!(ctx.tenant(), Some(&tenant));
        assert_eq!(ctx.acting_as(), Some("ops"));
        assert!(ctx.is_resolved());
    }
}
