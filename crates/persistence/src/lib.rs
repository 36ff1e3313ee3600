//! Stratum Persistence Layer
//!
//! Storage for a multi-tenant administrative service. Tenant records live in
//! a shared *control* store; each tenant's users, sessions and URL tokens
//! live in that tenant's own store ("schema-per-tenant").
//!
//! Every inbound call works through one [`TxContext`]: it resolves the
//! caller's tenant, lazily opens at most one transaction per store, and
//! commits or rolls both back together when the call ends.
//!
//! # Architecture
//!
//! - [`types`] - Tenants, users, sessions, URL tokens and pagination
//! - [`tenant`] - Short names, caller identity and the identity resolver
//! - [`core`] - Store traits, the store provider and the call signal
//! - [`context`] - The transactional context and its scoped guard
//! - [`strategy`] - Store naming for schema-per-tenant layout
//! - [`backends`] - Backend implementations (SQLite)
//! - [`error`] - Error types for all operations
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use stratum_persistence::backends::sqlite::SqliteProvider;
//! use stratum_persistence::core::CallSignal;
//! use stratum_persistence::tenant::{CallIdentity, IdentityResolver};
//! use stratum_persistence::types::NewUser;
//! use stratum_persistence::StorageError;
//!
//! # async fn example(identity: CallIdentity) -> Result<(), StorageError> {
//! let resolver = IdentityResolver::new(Arc::new(SqliteProvider::open("./data")?));
//!
//! let mut guard = resolver.context_for(&identity, CallSignal::new()).await?.guard();
//! let result = async {
//!     let tx = guard.tenant_tx().await?;
//!     tx.insert_user(NewUser::new("Ann", "ann@acme.io")).await
//! }
//! .await;
//! let user = guard.finish(result).await?;
//! # let _ = user;
//! # Ok(())
//! # }
//! ```
//!
//! # Cross-store commits
//!
//! Commit order is fixed: tenant store first, then control store. There is
//! no two-phase commit, so a control commit failing after a tenant commit
//! leaves the stores inconsistent; the context logs this at `error` level.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod context;
pub mod core;
pub mod error;
pub mod strategy;
pub mod tenant;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

// Re-export commonly used types at crate root
pub use context::{TxContext, TxGuard};
pub use error::{StorageError, StorageResult, StoreKind};
pub use tenant::{CallIdentity, IdentityResolver, TenantShortName};

// Re-export core traits
pub use core::{
    CallSignal, ControlStore, ControlTransaction, StoreProvider, TenantStore, TenantTransaction,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
