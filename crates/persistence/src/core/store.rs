//! Store handles and the injected store provider.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StorageResult;
use crate::tenant::TenantShortName;
use crate::types::{Page, Session, Tenant, User};

use super::signal::CallSignal;
use super::transaction::{ControlTransaction, TenantTransaction};

/// Handle to the shared control store.
#[async_trait]
pub trait ControlStore: Send + Sync {
    /// Begins a transaction bound to `signal`.
    async fn begin(&self, signal: &CallSignal) -> StorageResult<Box<dyn ControlTransaction>>;

    /// Reads a tenant outside of any transaction.
    async fn tenant_by_id(&self, id: Uuid, signal: &CallSignal) -> StorageResult<Option<Tenant>>;

    /// Lists all tenants ordered by short name.
    async fn list_tenants(&self, signal: &CallSignal) -> StorageResult<Vec<Tenant>>;
}

/// Handle to one tenant's store.
///
/// The read methods run outside any transaction and are meant for
/// operations that do not need transactional isolation.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// The short name this store belongs to.
    fn short_name(&self) -> &TenantShortName;

    /// Begins a transaction bound to `signal`.
    async fn begin(&self, signal: &CallSignal) -> StorageResult<Box<dyn TenantTransaction>>;

    /// Reads a user by id.
    async fn user_by_id(&self, id: Uuid, signal: &CallSignal) -> StorageResult<Option<User>>;

    /// Reads a session by id.
    async fn session_by_id(&self, id: &str, signal: &CallSignal) -> StorageResult<Option<Session>>;

    /// Reads one page of users in creation order.
    async fn list_users(&self, page: Page, signal: &CallSignal) -> StorageResult<Vec<User>>;

    /// Counts all users in the tenant.
    async fn count_users(&self, signal: &CallSignal) -> StorageResult<u64>;
}

/// Source of store handles.
///
/// Passed explicitly into the identity resolver and every transactional
/// context so that tests can substitute a fake or fault-injecting provider.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    /// Returns the control store.
    fn control(&self) -> Arc<dyn ControlStore>;

    /// Returns the store for `short_name`, opening it on first use and
    /// caching it for later calls.
    ///
    /// # Errors
    ///
    /// Returns `TenantError::NotFound` if the store was never provisioned.
    async fn tenant_store(&self, short_name: &TenantShortName) -> StorageResult<Arc<dyn TenantStore>>;

    /// Creates and initialises the store for a new tenant.
    async fn provision_tenant_store(
        &self,
        short_name: &TenantShortName,
    ) -> StorageResult<Arc<dyn TenantStore>>;

    /// Closes and, if configured, destroys a tenant's store.
    async fn remove_tenant_store(&self, short_name: &TenantShortName) -> StorageResult<()>;
}
