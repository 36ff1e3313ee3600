//! Transaction traits for the control and tenant stores.
//!
//! A transaction is consumed by `commit()` or `rollback()`; dropping one that
//! was never resolved rolls it back.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StorageResult;
use crate::tenant::TenantShortName;
use crate::types::{NewUser, Session, SessionStatus, Tenant, UrlToken, User};

/// An open transaction against the control store.
#[async_trait]
pub trait ControlTransaction: Send {
    /// Reads a tenant by its identifier.
    async fn tenant_by_id(&mut self, id: Uuid) -> StorageResult<Option<Tenant>>;

    /// Reads a tenant by its short name.
    async fn tenant_by_short_name(
        &mut self,
        short_name: &TenantShortName,
    ) -> StorageResult<Option<Tenant>>;

    /// Inserts a tenant row.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::AlreadyExists` if the id or short name is taken.
    async fn insert_tenant(&mut self, tenant: &Tenant) -> StorageResult<()>;

    /// Deletes a tenant row, returning `false` if there was none.
    async fn delete_tenant(&mut self, id: Uuid) -> StorageResult<bool>;

    /// Commits the transaction.
    async fn commit(self: Box<Self>) -> StorageResult<()>;

    /// Rolls back the transaction.
    async fn rollback(self: Box<Self>) -> StorageResult<()>;
}

/// An open transaction against one tenant's store.
///
/// All reads see the transaction's own uncommitted writes.
#[async_trait]
pub trait TenantTransaction: Send {
    /// Inserts a user row and returns it with its generated id.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::AlreadyExists` when the name or email is
    /// already used in this tenant.
    async fn insert_user(&mut self, user: NewUser) -> StorageResult<User>;

    /// Reads a user by id.
    async fn user_by_id(&mut self, id: Uuid) -> StorageResult<Option<User>>;

    /// Reads a user by email.
    async fn user_by_email(&mut self, email: &str) -> StorageResult<Option<User>>;

    /// Replaces a user's password digest. Fails with `NotFound` if the user
    /// does not exist.
    async fn set_password_digest(&mut self, user_id: Uuid, digest: &str) -> StorageResult<()>;

    /// Sets a user's enabled flag. Fails with `NotFound` if the user does not
    /// exist.
    async fn set_enabled(&mut self, user_id: Uuid, enabled: bool) -> StorageResult<()>;

    /// Inserts a session row.
    async fn insert_session(&mut self, session: &Session) -> StorageResult<()>;

    /// Updates a session's status. Fails with `NotFound` if the session does
    /// not exist.
    async fn set_session_status(&mut self, id: &str, status: SessionStatus) -> StorageResult<()>;

    /// Persists a one-time URL token.
    async fn insert_url_token(&mut self, token: &UrlToken) -> StorageResult<()>;

    /// Commits the transaction.
    async fn commit(self: Box<Self>) -> StorageResult<()>;

    /// Rolls back the transaction.
    async fn rollback(self: Box<Self>) -> StorageResult<()>;
}
