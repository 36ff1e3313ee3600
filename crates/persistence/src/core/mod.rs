//! Core storage traits and abstractions.
//!
//! - [`CallSignal`] - per-call cancellation and deadline
//! - [`ControlTransaction`] / [`TenantTransaction`] - store transactions
//! - [`ControlStore`] / [`TenantStore`] - store handles
//! - [`StoreProvider`] - the injected source of store handles
//!
//! ```text
//! StoreProvider
//!     ├── control()          -> ControlStore -> begin() -> ControlTransaction
//!     └── tenant_store(name) -> TenantStore  -> begin() -> TenantTransaction
//! ```

pub mod signal;
pub mod store;
pub mod transaction;

pub use signal::CallSignal;
pub use store::{ControlStore, StoreProvider, TenantStore};
pub use transaction::{ControlTransaction, TenantTransaction};
