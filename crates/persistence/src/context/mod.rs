//! The per-call transactional context.
//!
//! A [`TxContext`] owns at most one open transaction against the control
//! store and at most one against the bound tenant's store. Both are opened
//! lazily on first use and resolved together by [`TxContext::commit`] or
//! [`TxContext::rollback`], always tenant store first.
//!
//! Commit is sequential, not atomic across the two stores. If the tenant
//! commit fails, the control transaction has not been committed yet and is
//! rolled back. If the control commit fails after the tenant commit
//! succeeded, the tenant commit stands and the stores disagree until
//! reconciled externally.
//!
//! Prefer [`TxContext::guard`], which gives exactly one resolution path.

mod guard;

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::core::{CallSignal, ControlTransaction, StoreProvider, TenantStore, TenantTransaction};
use crate::error::{StorageResult, StoreKind, TenantError};
use crate::types::Tenant;

pub use guard::TxGuard;

/// Call-scoped owner of the control and tenant store transactions.
///
/// Never shared between calls. Must be resolved with `commit()` or
/// `rollback()` before it is dropped.
pub struct TxContext {
    provider: Arc<dyn StoreProvider>,
    tenant: Option<Tenant>,
    acting_as: Option<String>,
    signal: CallSignal,
    control_tx: Option<Box<dyn ControlTransaction>>,
    tenant_tx: Option<Box<dyn TenantTransaction>>,
    tenant_store: Option<Arc<dyn TenantStore>>,
}

impl std::fmt::Debug for TxContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxContext")
            .field("tenant", &self.tenant)
            .field("acting_as", &self.acting_as)
            .field("control_tx_open", &self.control_tx.is_some())
            .field("tenant_tx_open", &self.tenant_tx.is_some())
            .finish_non_exhaustive()
    }
}

impl TxContext {
    /// Creates a context. `tenant` is `None` for calls that only touch the
    /// control store.
    pub fn new(provider: Arc<dyn StoreProvider>, tenant: Option<Tenant>, signal: CallSignal) -> Self {
        Self {
            provider,
            tenant,
            acting_as: None,
            signal,
            control_tx: None,
            tenant_tx: None,
            tenant_store: None,
        }
    }

    /// Records the auditing "acting as" identity.
    pub fn with_acting_as(mut self, acting_as: Option<String>) -> Self {
        self.acting_as = acting_as;
        self
    }

    /// Returns the bound tenant, if any.
    pub fn tenant(&self) -> Option<&Tenant> {
        self.tenant.as_ref()
    }

    /// Returns the "acting as" identity, if any.
    pub fn acting_as(&self) -> Option<&str> {
        self.acting_as.as_deref()
    }

    /// Returns the call's signal.
    pub fn signal(&self) -> &CallSignal {
        &self.signal
    }

    /// Returns `true` when no transaction is open.
    pub fn is_resolved(&self) -> bool {
        self.control_tx.is_none() && self.tenant_tx.is_none()
    }

    fn bound_tenant(&self) -> StorageResult<&Tenant> {
        self.tenant.as_ref().ok_or_else(|| TenantError::NoTenantBound.into())
    }

    fn tenant_label(&self) -> &str {
        self.tenant.as_ref().map_or("-", |t| t.short_name.as_str())
    }

    /// Returns the control-store transaction, beginning one on first call.
    pub async fn control_tx(&mut self) -> StorageResult<&mut dyn ControlTransaction> {
        let tx = match self.control_tx.take() {
            Some(tx) => tx,
            None => {
                debug!(tenant = self.tenant_label(), store = %StoreKind::Control, "beginning transaction");
                self.provider.control().begin(&self.signal).await?
            }
        };
        Ok(self.control_tx.insert(tx).as_mut())
    }

    /// Returns the bound tenant's store transaction, beginning one on first
    /// call.
    ///
    /// # Errors
    ///
    /// Returns `TenantError::NoTenantBound` on a context without a tenant.
    pub async fn tenant_tx(&mut self) -> StorageResult<&mut dyn TenantTransaction> {
        let tx = match self.tenant_tx.take() {
            Some(tx) => tx,
            None => {
                let store = self.tenant_store().await?;
                debug!(tenant = self.tenant_label(), store = %StoreKind::Tenant, "beginning transaction");
                store.begin(&self.signal).await?
            }
        };
        Ok(self.tenant_tx.insert(tx).as_mut())
    }

    /// Returns the bound tenant's store handle for non-transactional reads.
    pub async fn tenant_store(&mut self) -> StorageResult<Arc<dyn TenantStore>> {
        if let Some(store) = &self.tenant_store {
            return Ok(Arc::clone(store));
        }
        let short_name = self.bound_tenant()?.short_name.clone();
        let store = self.provider.tenant_store(&short_name).await?;
        self.tenant_store = Some(Arc::clone(&store));
        Ok(store)
    }

    /// Commits the tenant transaction, then the control transaction.
    ///
    /// Resolved slots are cleared, so a second call is a no-op.
    pub async fn commit(&mut self) -> StorageResult<()> {
        let mut tenant_committed = false;
        if let Some(tx) = self.tenant_tx.take() {
            if let Err(err) = tx.commit().await {
                error!(tenant = self.tenant_label(), store = %StoreKind::Tenant, error = %err, "commit failed");
                if let Some(control) = self.control_tx.take() {
                    if let Err(rb) = control.rollback().await {
                        warn!(
                            tenant = self.tenant_label(),
                            store = %StoreKind::Control,
                            error = %rb,
                            "rollback after failed tenant commit failed"
                        );
                    }
                }
                return Err(err);
            }
            tenant_committed = true;
        }

        if let Some(tx) = self.control_tx.take() {
            if let Err(err) = tx.commit().await {
                if tenant_committed {
                    error!(
                        tenant = self.tenant_label(),
                        store = %StoreKind::Control,
                        error = %err,
                        "control commit failed after tenant commit; stores are inconsistent"
                    );
                } else {
                    error!(tenant = self.tenant_label(), store = %StoreKind::Control, error = %err, "commit failed");
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Rolls back the tenant transaction, then the control transaction.
    ///
    /// Both slots are always attempted; the first failure is returned.
    pub async fn rollback(&mut self) -> StorageResult<()> {
        let mut first_err = None;

        if let Some(tx) = self.tenant_tx.take() {
            if let Err(err) = tx.rollback().await {
                warn!(tenant = self.tenant_label(), store = %StoreKind::Tenant, error = %err, "rollback failed");
                first_err.get_or_insert(err);
            }
        }
        if let Some(tx) = self.control_tx.take() {
            if let Err(err) = tx.rollback().await {
                warn!(tenant = self.tenant_label(), store = %StoreKind::Control, error = %err, "rollback failed");
                first_err.get_or_insert(err);
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Wraps this context in a guard that must be finished exactly once.
    pub fn guard(self) -> TxGuard {
        TxGuard::new(self)
    }
}

impl Drop for TxContext {
    fn drop(&mut self) {
        if !self.is_resolved() {
            error!(
                tenant = self.tenant_label(),
                control_open = self.control_tx.is_some(),
                tenant_open = self.tenant_tx.is_some(),
                "transactional context dropped with unresolved transactions"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::sqlite::SqliteProvider;
    use crate::error::{StorageError, TransactionError};
    use crate::tenant::TenantShortName;
    use crate::testing::FaultyProvider;
    use crate::types::NewUser;

    async fn setup() -> (Arc<FaultyProvider>, Tenant) {
        let sqlite = SqliteProvider::in_memory().unwrap();
        let provider = Arc::new(FaultyProvider::new(Arc::new(sqlite)));
        let short_name = TenantShortName::new("acme").unwrap();
        provider.provision_tenant_store(&short_name).await.unwrap();

        let tenant = Tenant::new(short_name, "Acme");
        let mut ctx = TxContext::new(provider.clone(), None, CallSignal::new());
        ctx.control_tx().await.unwrap().insert_tenant(&tenant).await.unwrap();
        ctx.commit().await.unwrap();

        provider.reset();
        (provider, tenant)
    }

    fn context(provider: &Arc<FaultyProvider>, tenant: &Tenant) -> TxContext {
        TxContext::new(provider.clone(), Some(tenant.clone()), CallSignal::new())
    }

    #[tokio::test]
    async fn test_transactions_begin_lazily_once() {
        let (provider, tenant) = setup().await;
        let mut ctx = context(&provider, &tenant);
        assert_eq!(provider.begins(StoreKind::Tenant), 0);

        ctx.tenant_tx().await.unwrap();
        ctx.tenant_tx().await.unwrap();
        assert_eq!(provider.begins(StoreKind::Tenant), 1);
        assert_eq!(provider.begins(StoreKind::Control), 0);

        ctx.commit().await.unwrap();
        assert_eq!(provider.commits(StoreKind::Tenant), 1);
        assert_eq!(provider.commits(StoreKind::Control), 0);
    }

    #[tokio::test]
    async fn test_second_commit_and_rollback_are_noops() {
        let (provider, tenant) = setup().await;
        let mut ctx = context(&provider, &tenant);
        ctx.tenant_tx().await.unwrap();
        ctx.control_tx().await.unwrap();

        ctx.commit().await.unwrap();
        assert!(ctx.is_resolved());
        ctx.commit().await.unwrap();
        ctx.rollback().await.unwrap();

        assert_eq!(provider.commits(StoreKind::Tenant), 1);
        assert_eq!(provider.commits(StoreKind::Control), 1);
        assert_eq!(provider.rollbacks(StoreKind::Tenant), 0);
        assert_eq!(provider.rollbacks(StoreKind::Control), 0);
    }

    #[tokio::test]
    async fn test_tenant_commit_failure_rolls_back_control() {
        let (provider, tenant) = setup().await;
        provider.fail_commit(StoreKind::Tenant, true);

        let mut ctx = context(&provider, &tenant);
        ctx.tenant_tx()
            .await
            .unwrap()
            .insert_user(NewUser::new("Ann", "ann@acme.io"))
            .await
            .unwrap();
        let other = Tenant::new(TenantShortName::new("globex").unwrap(), "Globex");
        ctx.control_tx().await.unwrap().insert_tenant(&other).await.unwrap();

        let err = ctx.commit().await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Transaction(TransactionError::CommitFailed { store: StoreKind::Tenant, .. })
        ));
        assert!(ctx.is_resolved());
        assert_eq!(provider.commits(StoreKind::Control), 0);
        assert_eq!(provider.rollbacks(StoreKind::Control), 1);

        let control = provider.control();
        assert!(control.tenant_by_id(other.id, &CallSignal::new()).await.unwrap().is_none());
        let store = provider.tenant_store(&tenant.short_name).await.unwrap();
        assert_eq!(store.count_users(&CallSignal::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_control_commit_failure_keeps_tenant_commit() {
        let (provider, tenant) = setup().await;
        provider.fail_commit(StoreKind::Control, true);

        let mut ctx = context(&provider, &tenant);
        ctx.tenant_tx()
            .await
            .unwrap()
            .insert_user(NewUser::new("Ann", "ann@acme.io"))
            .await
            .unwrap();
        let other = Tenant::new(TenantShortName::new("globex").unwrap(), "Globex");
        ctx.control_tx().await.unwrap().insert_tenant(&other).await.unwrap();

        let err = ctx.commit().await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Transaction(TransactionError::CommitFailed { store: StoreKind::Control, .. })
        ));

        let store = provider.tenant_store(&tenant.short_name).await.unwrap();
        assert_eq!(store.count_users(&CallSignal::new()).await.unwrap(), 1);
        let control = provider.control();
        assert!(control.tenant_by_id(other.id, &CallSignal::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rollback_attempts_both_and_returns_first_failure() {
        let (provider, tenant) = setup().await;
        provider.fail_rollback(StoreKind::Tenant, true);

        let mut ctx = context(&provider, &tenant);
        ctx.tenant_tx().await.unwrap();
        ctx.control_tx().await.unwrap();

        let err = ctx.rollback().await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Transaction(TransactionError::RollbackFailed { store: StoreKind::Tenant, .. })
        ));
        assert_eq!(provider.rollbacks(StoreKind::Control), 1);
        assert!(ctx.is_resolved());
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let (provider, tenant) = setup().await;
        let mut ctx = context(&provider, &tenant);
        ctx.tenant_tx()
            .await
            .unwrap()
            .insert_user(NewUser::new("Ann", "ann@acme.io"))
            .await
            .unwrap();
        ctx.rollback().await.unwrap();

        let store = ctx.tenant_store().await.unwrap();
        assert_eq!(store.count_users(&CallSignal::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_tenant_tx_requires_bound_tenant() {
        let (provider, _) = setup().await;
        let mut ctx = TxContext::new(provider.clone(), None, CallSignal::new());

        let err = ctx.tenant_tx().await.err().expect("expected error");
        assert!(matches!(err, StorageError::Tenant(TenantError::NoTenantBound)));
        assert!(ctx.tenant_store().await.is_err());
        assert!(ctx.is_resolved());
    }

    #[tokio::test]
    async fn test_begin_failure_leaves_context_resolved() {
        let (provider, tenant) = setup().await;
        provider.fail_begin(StoreKind::Control, true);

        let mut ctx = context(&provider, &tenant);
        assert!(ctx.control_tx().await.is_err());
        assert!(ctx.is_resolved());

        provider.fail_begin(StoreKind::Control, false);
        ctx.control_tx().await.unwrap();
        ctx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_tenant_store_is_cached() {
        let (provider, tenant) = setup().await;
        let mut ctx = context(&provider, &tenant);
        let first = ctx.tenant_store().await.unwrap();
        let second = ctx.tenant_store().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.short_name(), &tenant.short_name);
    }

    #[tokio::test]
    async fn test_cancelled_signal_aborts_statements() {
        let (provider, tenant) = setup().await;
        let signal = CallSignal::new();
        let mut ctx = TxContext::new(provider.clone(), Some(tenant.clone()), signal.clone());

        ctx.tenant_tx().await.unwrap();
        signal.cancel();

        let err = ctx
            .tenant_tx()
            .await
            .unwrap()
            .insert_user(NewUser::new("Ann", "ann@acme.io"))
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(ctx.commit().await.unwrap_err().is_cancelled());
        assert!(ctx.is_resolved());

        let mut fresh = context(&provider, &tenant);
        let store = fresh.tenant_store().await.unwrap();
        assert_eq!(store.count_users(&CallSignal::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_signal_prevents_begin() {
        let (provider, tenant) = setup().await;
        let signal = CallSignal::new();
        signal.cancel();
        let mut ctx = TxContext::new(provider.clone(), Some(tenant), signal);

        assert!(ctx.tenant_tx().await.err().expect("expected error").is_cancelled());
        assert!(ctx.is_resolved());
    }

    #[tokio::test]
    async fn test_guard_commits_on_ok() {
        let (provider, tenant) = setup().await;
        let mut guard = context(&provider, &tenant).guard();
        let result: StorageResult<_> = async {
            let tx = guard.tenant_tx().await?;
            tx.insert_user(NewUser::new("Ann", "ann@acme.io")).await
        }
        .await;
        let user = guard.finish(result).await.unwrap();

        let store = provider.tenant_store(&tenant.short_name).await.unwrap();
        let stored = store.user_by_id(user.id, &CallSignal::new()).await.unwrap();
        assert_eq!(stored.map(|u| u.email), Some("ann@acme.io".to_string()));
        assert_eq!(provider.commits(StoreKind::Tenant), 1);
    }

    #[tokio::test]
    async fn test_guard_returns_original_error_when_rollback_fails() {
        let (provider, tenant) = setup().await;
        provider.fail_rollback(StoreKind::Tenant, true);

        let mut guard = context(&provider, &tenant).guard();
        guard
            .context()
            .tenant_tx()
            .await
            .unwrap()
            .insert_user(NewUser::new("Ann", "ann@acme.io"))
            .await
            .unwrap();
        let result: Result<(), StorageError> = Err(StorageError::Validation(
            crate::error::ValidationError::MissingRequiredField {
                field: "name".to_string(),
            },
        ));

        let err = guard.finish(result).await.unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
        assert_eq!(provider.rollbacks(StoreKind::Tenant), 1);
        assert_eq!(provider.commits(StoreKind::Tenant), 0);
    }

    #[tokio::test]
    async fn test_guard_surfaces_commit_failure() {
        let (provider, tenant) = setup().await;
        provider.fail_commit(StoreKind::Tenant, true);

        let mut guard = context(&provider, &tenant).guard();
        guard.tenant_tx().await.unwrap();
        let err = guard.finish(Ok::<_, StorageError>(())).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Transaction(TransactionError::CommitFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_acting_as_is_carried() {
        let (provider, tenant) = setup().await;
        let mut ctx = context(&provider, &tenant).with_acting_as(Some("ops@acme.io".to_string()));
        assert_eq!(ctx.acting_as(), Some("ops@acme.io"));
        assert_eq!(ctx.tenant().map(|t| t.id), Some(tenant.id));
        ctx.rollback().await.unwrap();
    }
}
