//! Control store: tenant records.

use async_trait::async_trait;
use chrono::Utc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::core::{CallSignal, ControlStore, ControlTransaction};
use crate::error::{StorageResult, StoreKind};
use crate::tenant::TenantShortName;
use crate::types::Tenant;

use super::backend::get_connection;
use super::rows::{insert_error, parsed_column, uuid_column};
use super::transaction::{SqliteTx, watch};

const TENANT_COLUMNS: &str = "id, short_name, name";

fn tenant_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tenant> {
    Ok(Tenant {
        id: uuid_column(row, 0)?,
        short_name: parsed_column(row, 1)?,
        name: row.get(2)?,
    })
}

fn select_tenant_by_id(conn: &Connection, id: Uuid) -> StorageResult<Option<Tenant>> {
    let sql = format!("SELECT {} FROM tenants WHERE id = ?1", TENANT_COLUMNS);
    Ok(conn
        .query_row(&sql, params![id.to_string()], tenant_from_row)
        .optional()?)
}

fn select_tenant_by_short_name(conn: &Connection, short_name: &TenantShortName) -> StorageResult<Option<Tenant>> {
    let sql = format!("SELECT {} FROM tenants WHERE short_name = ?1", TENANT_COLUMNS);
    Ok(conn
        .query_row(&sql, params![short_name.as_str()], tenant_from_row)
        .optional()?)
}

fn select_tenants(conn: &Connection) -> StorageResult<Vec<Tenant>> {
    let sql = format!("SELECT {} FROM tenants ORDER BY short_name", TENANT_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let tenants = stmt
        .query_map([], tenant_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tenants)
}

/// Control-store transaction.
#[derive(Debug)]
pub struct SqliteControlTransaction {
    tx: SqliteTx,
}

#[async_trait]
impl ControlTransaction for SqliteControlTransaction {
    async fn tenant_by_id(&mut self, id: Uuid) -> StorageResult<Option<Tenant>> {
        select_tenant_by_id(self.tx.conn()?, id)
    }

    async fn tenant_by_short_name(&mut self, short_name: &TenantShortName) -> StorageResult<Option<Tenant>> {
        select_tenant_by_short_name(self.tx.conn()?, short_name)
    }

    async fn insert_tenant(&mut self, tenant: &Tenant) -> StorageResult<()> {
        self.tx
            .conn()?
            .execute(
                "INSERT INTO tenants (id, short_name, name, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    tenant.id.to_string(),
                    tenant.short_name.as_str(),
                    tenant.name,
                    Utc::now().to_rfc3339()
                ],
            )
            .map_err(|e| insert_error(e, "tenant", tenant.short_name.as_str()))?;
        Ok(())
    }

    async fn delete_tenant(&mut self, id: Uuid) -> StorageResult<bool> {
        let deleted = self
            .tx
            .conn()?
            .execute("DELETE FROM tenants WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }

    async fn commit(mut self: Box<Self>) -> StorageResult<()> {
        self.tx.commit()
    }

    async fn rollback(mut self: Box<Self>) -> StorageResult<()> {
        self.tx.rollback()
    }
}

/// The SQLite control store.
#[derive(Clone)]
pub struct SqliteControlStore {
    pool: Pool<SqliteConnectionManager>,
}

impl std::fmt::Debug for SqliteControlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteControlStore")
            .field("connections", &self.pool.state().connections)
            .finish()
    }
}

impl SqliteControlStore {
    pub(crate) fn new(pool: Pool<SqliteConnectionManager>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ControlStore for SqliteControlStore {
    async fn begin(&self, signal: &CallSignal) -> StorageResult<Box<dyn ControlTransaction>> {
        let conn = get_connection(&self.pool, StoreKind::Control)?;
        let tx = SqliteTx::begin(conn, StoreKind::Control, signal)?;
        Ok(Box::new(SqliteControlTransaction { tx }))
    }

    async fn tenant_by_id(&self, id: Uuid, signal: &CallSignal) -> StorageResult<Option<Tenant>> {
        signal.check()?;
        let conn = get_connection(&self.pool, StoreKind::Control)?;
        let _watch = watch(&conn, signal);
        select_tenant_by_id(&conn, id)
    }

    async fn list_tenants(&self, signal: &CallSignal) -> StorageResult<Vec<Tenant>> {
        signal.check()?;
        let conn = get_connection(&self.pool, StoreKind::Control)?;
        let _watch = watch(&conn, signal);
        select_tenants(&conn)
    }
}
