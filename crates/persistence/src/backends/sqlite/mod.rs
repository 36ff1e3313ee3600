//! SQLite backend implementation.
//!
//! The control store and every tenant store are separate SQLite databases,
//! each behind its own r2d2 pool. Databases are either files under a data
//! directory (`control.db`, `tenant_acme.db`, ...) or shared-cache in-memory
//! databases private to one provider instance, which is what the tests use.
//!
//! # Example
//!
//! ```no_run
//! use stratum_persistence::backends::sqlite::SqliteProvider;
//! use stratum_persistence::core::{StoreProvider, TenantStore};
//! use stratum_persistence::tenant::TenantShortName;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = SqliteProvider::open("./data")?;
//! let acme = TenantShortName::new("acme")?;
//! let store = provider.provision_tenant_store(&acme).await?;
//! assert_eq!(store.short_name(), &acme);
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! -- control store
//! CREATE TABLE tenants (
//!     id TEXT PRIMARY KEY,
//!     short_name TEXT NOT NULL UNIQUE,
//!     name TEXT NOT NULL,
//!     created_at TEXT NOT NULL
//! );
//!
//! -- each tenant store
//! CREATE TABLE users (
//!     id TEXT PRIMARY KEY,
//!     name TEXT NOT NULL UNIQUE,
//!     email TEXT NOT NULL UNIQUE,
//!     password_digest TEXT,
//!     enabled INTEGER NOT NULL DEFAULT 1,
//!     created_at TEXT NOT NULL
//! );
//! CREATE TABLE sessions (id TEXT PRIMARY KEY, user_id TEXT, status TEXT, created_at TEXT);
//! CREATE TABLE url_tokens (id TEXT PRIMARY KEY, user_id TEXT, kind TEXT, expires_at TEXT, consumed INTEGER);
//! ```
//!
//! Transactions use `BEGIN IMMEDIATE`, so the write lock is taken up front
//! and a transaction never fails half way on lock upgrade.

mod backend;
mod control;
mod rows;
pub mod schema;
mod tenant;
mod transaction;

pub use backend::{SqliteProvider, SqliteStoreConfig, StoreLocation};
pub use control::{SqliteControlStore, SqliteControlTransaction};
pub use tenant::{SqliteTenantStore, SqliteTenantTransaction};
