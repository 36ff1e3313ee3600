//! Storage backend implementations.
//!
//! - `sqlite` (default feature) - file-backed or in-memory SQLite

#[cfg(feature = "sqlite")]
pub mod sqlite;
