//! Fault injection for testing commit and rollback handling.
//!
//! [`FaultyProvider`] wraps any [`StoreProvider`] and, per store kind,
//! counts transaction begins, commits and rollbacks and fails them on
//! demand. An injected commit failure rolls the real transaction back, so
//! the store is left exactly as a genuinely failed commit would leave it.
//!
//! ```text
//! TxContext ──▶ FaultyProvider ──▶ inner StoreProvider
//!                  │ begin?  commit?  rollback?
//!                  └─ counts + injected failures per StoreKind
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::{
    CallSignal, ControlStore, ControlTransaction, StoreProvider, TenantStore, TenantTransaction,
};
use crate::error::{StorageError, StorageResult, StoreKind, TransactionError};
use crate::tenant::TenantShortName;
use crate::types::{NewUser, Page, Session, SessionStatus, Tenant, UrlToken, User};

/// Injected failures and call counters for one store kind.
#[derive(Debug, Default)]
struct StoreFaults {
    fail_begin: AtomicBool,
    fail_commit: AtomicBool,
    fail_rollback: AtomicBool,
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl StoreFaults {
    fn on_begin(&self, store: StoreKind) -> StorageResult<()> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        if self.fail_begin.load(Ordering::SeqCst) {
            return Err(TransactionError::BeginFailed {
                store,
                reason: "injected begin failure".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn commit_fails(&self) -> bool {
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.fail_commit.load(Ordering::SeqCst)
    }

    fn rollback_fails(&self) -> bool {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.fail_rollback.load(Ordering::SeqCst)
    }
}

fn injected_commit_failure(store: StoreKind) -> StorageError {
    TransactionError::CommitFailed {
        store,
        reason: "injected commit failure".to_string(),
    }
    .into()
}

fn injected_rollback_failure(store: StoreKind) -> StorageError {
    TransactionError::RollbackFailed {
        store,
        reason: "injected rollback failure".to_string(),
    }
    .into()
}

/// A [`StoreProvider`] decorator that counts and fails transaction calls.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use stratum_persistence::backends::sqlite::SqliteProvider;
/// use stratum_persistence::error::StoreKind;
/// use stratum_persistence::testing::FaultyProvider;
///
/// let provider = FaultyProvider::new(Arc::new(SqliteProvider::in_memory().unwrap()));
/// provider.fail_commit(StoreKind::Tenant, true);
/// assert_eq!(provider.commits(StoreKind::Tenant), 0);
/// ```
#[derive(Clone)]
pub struct FaultyProvider {
    inner: Arc<dyn StoreProvider>,
    control: Arc<StoreFaults>,
    tenant: Arc<StoreFaults>,
}

impl std::fmt::Debug for FaultyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultyProvider")
            .field("control", &self.control)
            .field("tenant", &self.tenant)
            .finish_non_exhaustive()
    }
}

impl FaultyProvider {
    /// Wraps `inner` with no faults enabled.
    pub fn new(inner: Arc<dyn StoreProvider>) -> Self {
        Self {
            inner,
            control: Arc::new(StoreFaults::default()),
            tenant: Arc::new(StoreFaults::default()),
        }
    }

    fn faults(&self, store: StoreKind) -> &StoreFaults {
        match store {
            StoreKind::Control => &self.control,
            StoreKind::Tenant => &self.tenant,
        }
    }

    /// Makes every `begin` on `store` fail.
    pub fn fail_begin(&self, store: StoreKind, fail: bool) {
        self.faults(store).fail_begin.store(fail, Ordering::SeqCst);
    }

    /// Makes every `commit` on `store` roll back and fail.
    pub fn fail_commit(&self, store: StoreKind, fail: bool) {
        self.faults(store).fail_commit.store(fail, Ordering::SeqCst);
    }

    /// Makes every `rollback` on `store` report failure.
    pub fn fail_rollback(&self, store: StoreKind, fail: bool) {
        self.faults(store).fail_rollback.store(fail, Ordering::SeqCst);
    }

    /// Number of transactions begun on `store`.
    pub fn begins(&self, store: StoreKind) -> usize {
        self.faults(store).begins.load(Ordering::SeqCst)
    }

    /// Number of commit attempts on `store`.
    pub fn commits(&self, store: StoreKind) -> usize {
        self.faults(store).commits.load(Ordering::SeqCst)
    }

    /// Number of rollback attempts on `store`.
    pub fn rollbacks(&self, store: StoreKind) -> usize {
        self.faults(store).rollbacks.load(Ordering::SeqCst)
    }

    /// Clears all counters and disables all faults.
    pub fn reset(&self) {
        for faults in [&self.control, &self.tenant] {
            faults.fail_begin.store(false, Ordering::SeqCst);
            faults.fail_commit.store(false, Ordering::SeqCst);
            faults.fail_rollback.store(false, Ordering::SeqCst);
            faults.begins.store(0, Ordering::SeqCst);
            faults.commits.store(0, Ordering::SeqCst);
            faults.rollbacks.store(0, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl StoreProvider for FaultyProvider {
    fn control(&self) -> Arc<dyn ControlStore> {
        Arc::new(FaultyControlStore {
            inner: self.inner.control(),
            faults: Arc::clone(&self.control),
        })
    }

    async fn tenant_store(&self, short_name: &TenantShortName) -> StorageResult<Arc<dyn TenantStore>> {
        let inner = self.inner.tenant_store(short_name).await?;
        Ok(Arc::new(FaultyTenantStore {
            inner,
            faults: Arc::clone(&self.tenant),
        }))
    }

    async fn provision_tenant_store(
        &self,
        short_name: &TenantShortName,
    ) -> StorageResult<Arc<dyn TenantStore>> {
        let inner = self.inner.provision_tenant_store(short_name).await?;
        Ok(Arc::new(FaultyTenantStore {
            inner,
            faults: Arc::clone(&self.tenant),
        }))
    }

    async fn remove_tenant_store(&self, short_name: &TenantShortName) -> StorageResult<()> {
        self.inner.remove_tenant_store(short_name).await
    }
}

struct FaultyControlStore {
    inner: Arc<dyn ControlStore>,
    faults: Arc<StoreFaults>,
}

#[async_trait]
impl ControlStore for FaultyControlStore {
    async fn begin(&self, signal: &CallSignal) -> StorageResult<Box<dyn ControlTransaction>> {
        self.faults.on_begin(StoreKind::Control)?;
        let inner = self.inner.begin(signal).await?;
        Ok(Box::new(FaultyControlTransaction {
            inner,
            faults: Arc::clone(&self.faults),
        }))
    }

    async fn tenant_by_id(&self, id: Uuid, signal: &CallSignal) -> StorageResult<Option<Tenant>> {
        self.inner.tenant_by_id(id, signal).await
    }

    async fn list_tenants(&self, signal: &CallSignal) -> StorageResult<Vec<Tenant>> {
        self.inner.list_tenants(signal).await
    }
}

struct FaultyControlTransaction {
    inner: Box<dyn ControlTransaction>,
    faults: Arc<StoreFaults>,
}

#[async_trait]
impl ControlTransaction for FaultyControlTransaction {
    async fn tenant_by_id(&mut self, id: Uuid) -> StorageResult<Option<Tenant>> {
        self.inner.tenant_by_id(id).await
    }

    async fn tenant_by_short_name(&mut self, short_name: &TenantShortName) -> StorageResult<Option<Tenant>> {
        self.inner.tenant_by_short_name(short_name).await
    }

    async fn insert_tenant(&mut self, tenant: &Tenant) -> StorageResult<()> {
        self.inner.insert_tenant(tenant).await
    }

    async fn delete_tenant(&mut self, id: Uuid) -> StorageResult<bool> {
        self.inner.delete_tenant(id).await
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        let Self { inner, faults } = *self;
        if faults.commit_fails() {
            let _ = inner.rollback().await;
            return Err(injected_commit_failure(StoreKind::Control));
        }
        inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> StorageResult<()> {
        let Self { inner, faults } = *self;
        let fails = faults.rollback_fails();
        inner.rollback().await?;
        if fails {
            return Err(injected_rollback_failure(StoreKind::Control));
        }
        Ok(())
    }
}

struct FaultyTenantStore {
    inner: Arc<dyn TenantStore>,
    faults: Arc<StoreFaults>,
}

#[async_trait]
impl TenantStore for FaultyTenantStore {
    fn short_name(&self) -> &TenantShortName {
        self.inner.short_name()
    }

    async fn begin(&self, signal: &CallSignal) -> StorageResult<Box<dyn TenantTransaction>> {
        self.faults.on_begin(StoreKind::Tenant)?;
        let inner = self.inner.begin(signal).await?;
        Ok(Box::new(FaultyTenantTransaction {
            inner,
            faults: Arc::clone(&self.faults),
        }))
    }

    async fn user_by_id(&self, id: Uuid, signal: &CallSignal) -> StorageResult<Option<User>> {
        self.inner.user_by_id(id, signal).await
    }

    async fn session_by_id(&self, id: &str, signal: &CallSignal) -> StorageResult<Option<Session>> {
        self.inner.session_by_id(id, signal).await
    }

    async fn list_users(&self, page: Page, signal: &CallSignal) -> StorageResult<Vec<User>> {
        self.inner.list_users(page, signal).await
    }

    async fn count_users(&self, signal: &CallSignal) -> StorageResult<u64> {
        self.inner.count_users(signal).await
    }
}

struct FaultyTenantTransaction {
    inner: Box<dyn TenantTransaction>,
    faults: Arc<StoreFaults>,
}

#[async_trait]
impl TenantTransaction for FaultyTenantTransaction {
    async fn insert_user(&mut self, user: NewUser) -> StorageResult<User> {
        self.inner.insert_user(user).await
    }

    async fn user_by_id(&mut self, id: Uuid) -> StorageResult<Option<User>> {
        self.inner.user_by_id(id).await
    }

    async fn user_by_email(&mut self, email: &str) -> StorageResult<Option<User>> {
        self.inner.user_by_email(email).await
    }

    async fn set_password_digest(&mut self, user_id: Uuid, digest: &str) -> StorageResult<()> {
        self.inner.set_password_digest(user_id, digest).await
    }

    async fn set_enabled(&mut self, user_id: Uuid, enabled: bool) -> StorageResult<()> {
        self.inner.set_enabled(user_id, enabled).await
    }

    async fn insert_session(&mut self, session: &Session) -> StorageResult<()> {
        self.inner.insert_session(session).await
    }

    async fn set_session_status(&mut self, id: &str, status: SessionStatus) -> StorageResult<()> {
        self.inner.set_session_status(id, status).await
    }

    async fn insert_url_token(&mut self, token: &UrlToken) -> StorageResult<()> {
        self.inner.insert_url_token(token).await
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        let Self { inner, faults } = *self;
        if faults.commit_fails() {
            let _ = inner.rollback().await;
            return Err(injected_commit_failure(StoreKind::Tenant));
        }
        inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> StorageResult<()> {
        let Self { inner, faults } = *self;
        let fails = faults.rollback_fails();
        inner.rollback().await?;
        if fails {
            return Err(injected_rollback_failure(StoreKind::Tenant));
        }
        Ok(())
    }
}
