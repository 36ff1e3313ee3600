//! SQLite schema definitions and migrations.
//!
//! The control store and the tenant stores have separate schemas, each
//! versioned independently through a `schema_version` table.

use rusqlite::Connection;

use crate::error::{BackendError, StorageError, StorageResult, StoreKind};

/// Current control schema version.
pub const CONTROL_SCHEMA_VERSION: i32 = 1;

/// Current tenant schema version.
pub const TENANT_SCHEMA_VERSION: i32 = 2;

fn migration_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::MigrationError { message })
}

/// Initialize the schema for a store of the given kind.
pub fn initialize_schema(conn: &Connection, kind: StoreKind) -> StorageResult<()> {
    let target = match kind {
        StoreKind::Control => CONTROL_SCHEMA_VERSION,
        StoreKind::Tenant => TENANT_SCHEMA_VERSION,
    };
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        match kind {
            StoreKind::Control => create_control_schema_v1(conn)?,
            StoreKind::Tenant => create_tenant_schema_v1(conn)?,
        }
        set_schema_version(conn, 1)?;
        migrate_schema(conn, kind, 1, target)?;
    } else if current_version < target {
        migrate_schema(conn, kind, current_version, target)?;
    } else if current_version > target {
        return Err(migration_error(format!(
            "{} store schema version {} is newer than supported version {}",
            kind, current_version, target
        )));
    }

    Ok(())
}

/// Get the current schema version, or 0 for a fresh database.
pub(crate) fn get_schema_version(conn: &Connection) -> StorageResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| migration_error(format!("Failed to create schema_version table: {}", e)))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> StorageResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| migration_error(format!("Failed to clear schema_version: {}", e)))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| migration_error(format!("Failed to set schema_version: {}", e)))?;
    Ok(())
}

fn create_control_schema_v1(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tenants (
            id TEXT PRIMARY KEY,
            short_name TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        );",
    )
    .map_err(|e| migration_error(format!("Failed to create control schema: {}", e)))
}

fn create_tenant_schema_v1(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_digest TEXT,
            enabled INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            status TEXT NOT NULL DEFAULT 'valid',
            created_at TEXT NOT NULL
        );",
    )
    .map_err(|e| migration_error(format!("Failed to create tenant schema: {}", e)))
}

fn migrate_schema(conn: &Connection, kind: StoreKind, from_version: i32, target: i32) -> StorageResult<()> {
    let mut version = from_version;

    while version < target {
        match (kind, version) {
            (StoreKind::Tenant, 1) => migrate_tenant_v1_to_v2(conn)?,
            _ => {
                return Err(migration_error(format!(
                    "Unknown {} schema version: {}",
                    kind, version
                )));
            }
        }
        version += 1;
        set_schema_version(conn, version)?;
    }

    Ok(())
}

/// Migrate the tenant schema from version 1 to version 2.
///
/// Adds single-use URL tokens for signup and password-reset links, and an
/// index for looking up a user's sessions.
fn migrate_tenant_v1_to_v2(conn: &Connection) -> StorageResult<()> {
    let migrations = [
        "CREATE TABLE IF NOT EXISTS url_tokens (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            consumed INTEGER NOT NULL DEFAULT 0
        )",
        "CREATE INDEX IF NOT EXISTS idx_url_tokens_user ON url_tokens(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)",
    ];

    for sql in migrations {
        conn.execute(sql, [])
            .map_err(|e| migration_error(format!("Migration v1->v2 failed: {}", e)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_control_schema_initialization() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn, StoreKind::Control).unwrap();

        let tables = tables(&conn);
        assert!(tables.contains(&"tenants".to_string()));
        assert!(!tables.contains(&"users".to_string()));
        assert_eq!(get_schema_version(&conn).unwrap(), CONTROL_SCHEMA_VERSION);
    }

    #[test]
    fn test_tenant_schema_initialization() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn, StoreKind::Tenant).unwrap();

        let tables = tables(&conn);
        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"sessions".to_string()));
        assert!(tables.contains(&"url_tokens".to_string()));
        assert_eq!(get_schema_version(&conn).unwrap(), TENANT_SCHEMA_VERSION);
    }

    #[test]
    fn test_tenant_migration_from_v1() {
        let conn = Connection::open_in_memory().unwrap();
        get_schema_version(&conn).unwrap();
        create_tenant_schema_v1(&conn).unwrap();
        set_schema_version(&conn, 1).unwrap();

        initialize_schema(&conn, StoreKind::Tenant).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), TENANT_SCHEMA_VERSION);
        assert!(tables(&conn).contains(&"url_tokens".to_string()));
    }

    #[test]
    fn test_initialization_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn, StoreKind::Tenant).unwrap();
        initialize_schema(&conn, StoreKind::Tenant).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), TENANT_SCHEMA_VERSION);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn, StoreKind::Control).unwrap();
        set_schema_version(&conn, CONTROL_SCHEMA_VERSION + 1).unwrap();
        assert!(initialize_schema(&conn, StoreKind::Control).is_err());
    }
}
