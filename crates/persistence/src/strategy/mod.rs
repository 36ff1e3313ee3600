//! Tenancy layout.
//!
//! Tenant data lives in one store per tenant, selected by the tenant's short
//! name ("schema-per-tenant"). [`SchemaPerTenantStrategy`] derives and
//! validates store names; backends decide what a store physically is (a
//! PostgreSQL schema, a SQLite database file, ...).

mod schema_per_tenant;

pub use schema_per_tenant::{SchemaPerTenantConfig, SchemaPerTenantStrategy};
