//! Tenant naming, caller identity and tenant resolution.
//!
//! Every user operation needs a resolved [`Tenant`](crate::types::Tenant)
//! before it can touch user rows, because users live in the tenant's own
//! store. The [`IdentityResolver`] turns a [`CallIdentity`] into that tenant
//! and hands out [`TxContext`](crate::context::TxContext)s bound to it.

mod identity;
mod resolver;
mod short_name;

pub use identity::CallIdentity;
pub use resolver::IdentityResolver;
pub use short_name::{MAX_SHORT_NAME_LEN, TenantShortName};
