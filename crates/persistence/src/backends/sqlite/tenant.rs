//! Tenant stores: users, sessions and URL tokens.

use async_trait::async_trait;
use chrono::Utc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::core::{CallSignal, TenantStore, TenantTransaction};
use crate::error::{StorageResult, StoreKind};
use crate::tenant::TenantShortName;
use crate::types::{NewUser, Page, Session, SessionStatus, UrlToken, User};

use super::backend::get_connection;
use super::rows::{insert_error, parsed_column, require_updated, timestamp_column, uuid_column};
use super::transaction::{SqliteTx, watch};

const USER_COLUMNS: &str = "id, name, email, password_digest, enabled, created_at";

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_digest: row.get(3)?,
        enabled: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
    })
}

fn session_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        user_id: uuid_column(row, 1)?,
        status: parsed_column(row, 2)?,
        created_at: timestamp_column(row, 3)?,
    })
}

fn select_user_by_id(conn: &Connection, id: Uuid) -> StorageResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
    Ok(conn
        .query_row(&sql, params![id.to_string()], user_from_row)
        .optional()?)
}

fn select_user_by_email(conn: &Connection, email: &str) -> StorageResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS);
    Ok(conn.query_row(&sql, params![email], user_from_row).optional()?)
}

fn select_session(conn: &Connection, id: &str) -> StorageResult<Option<Session>> {
    Ok(conn
        .query_row(
            "SELECT id, user_id, status, created_at FROM sessions WHERE id = ?1",
            params![id],
            session_from_row,
        )
        .optional()?)
}

fn select_users(conn: &Connection, page: Page) -> StorageResult<Vec<User>> {
    let sql = format!(
        "SELECT {} FROM users ORDER BY rowid LIMIT ?1 OFFSET ?2",
        USER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let users = stmt
        .query_map(params![page.limit(), page.offset()], user_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

/// Tenant-store transaction.
#[derive(Debug)]
pub struct SqliteTenantTransaction {
    tx: SqliteTx,
}

#[async_trait]
impl TenantTransaction for SqliteTenantTransaction {
    async fn insert_user(&mut self, user: NewUser) -> StorageResult<User> {
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_digest: user.password_digest,
            enabled: user.enabled,
            created_at: Utc::now(),
        };
        self.tx
            .conn()?
            .execute(
                "INSERT INTO users (id, name, email, password_digest, enabled, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.id.to_string(),
                    user.name,
                    user.email,
                    user.password_digest,
                    user.enabled,
                    user.created_at.to_rfc3339()
                ],
            )
            .map_err(|e| insert_error(e, "user", &user.email))?;
        Ok(user)
    }

    async fn user_by_id(&mut self, id: Uuid) -> StorageResult<Option<User>> {
        select_user_by_id(self.tx.conn()?, id)
    }

    async fn user_by_email(&mut self, email: &str) -> StorageResult<Option<User>> {
        select_user_by_email(self.tx.conn()?, email)
    }

    async fn set_password_digest(&mut self, user_id: Uuid, digest: &str) -> StorageResult<()> {
        let changed = self.tx.conn()?.execute(
            "UPDATE users SET password_digest = ?1 WHERE id = ?2",
            params![digest, user_id.to_string()],
        )?;
        require_updated(changed, "user", user_id)
    }

    async fn set_enabled(&mut self, user_id: Uuid, enabled: bool) -> StorageResult<()> {
        let changed = self.tx.conn()?.execute(
            "UPDATE users SET enabled = ?1 WHERE id = ?2",
            params![enabled, user_id.to_string()],
        )?;
        require_updated(changed, "user", user_id)
    }

    async fn insert_session(&mut self, session: &Session) -> StorageResult<()> {
        self.tx
            .conn()?
            .execute(
                "INSERT INTO sessions (id, user_id, status, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    session.id,
                    session.user_id.to_string(),
                    session.status.as_str(),
                    session.created_at.to_rfc3339()
                ],
            )
            .map_err(|e| insert_error(e, "session", &session.id))?;
        Ok(())
    }

    async fn set_session_status(&mut self, id: &str, status: SessionStatus) -> StorageResult<()> {
        let changed = self.tx.conn()?.execute(
            "UPDATE sessions SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        require_updated(changed, "session", id)
    }

    async fn insert_url_token(&mut self, token: &UrlToken) -> StorageResult<()> {
        self.tx
            .conn()?
            .execute(
                "INSERT INTO url_tokens (id, user_id, kind, expires_at, consumed)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    token.id.to_string(),
                    token.user_id.to_string(),
                    token.kind.as_str(),
                    token.expires_at.to_rfc3339(),
                    token.consumed
                ],
            )
            .map_err(|e| insert_error(e, "url token", &token.id.to_string()))?;
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> StorageResult<()> {
        self.tx.commit()
    }

    async fn rollback(mut self: Box<Self>) -> StorageResult<()> {
        self.tx.rollback()
    }
}

/// One tenant's SQLite store.
#[derive(Clone)]
pub struct SqliteTenantStore {
    short_name: TenantShortName,
    pool: Pool<SqliteConnectionManager>,
}

impl std::fmt::Debug for SqliteTenantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTenantStore")
            .field("short_name", &self.short_name)
            .field("connections", &self.pool.state().connections)
            .finish()
    }
}

impl SqliteTenantStore {
    pub(crate) fn new(short_name: TenantShortName, pool: Pool<SqliteConnectionManager>) -> Self {
        Self { short_name, pool }
    }

    fn read_connection(
        &self,
        signal: &CallSignal,
    ) -> StorageResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        signal.check()?;
        get_connection(&self.pool, StoreKind::Tenant)
    }
}

#[async_trait]
impl TenantStore for SqliteTenantStore {
    fn short_name(&self) -> &TenantShortName {
        &self.short_name
    }

    async fn begin(&self, signal: &CallSignal) -> StorageResult<Box<dyn TenantTransaction>> {
        let conn = get_connection(&self.pool, StoreKind::Tenant)?;
        let tx = SqliteTx::begin(conn, StoreKind::Tenant, signal)?;
        Ok(Box::new(SqliteTenantTransaction { tx }))
    }

    async fn user_by_id(&self, id: Uuid, signal: &CallSignal) -> StorageResult<Option<User>> {
        let conn = self.read_connection(signal)?;
        let _watch = watch(&conn, signal);
        select_user_by_id(&conn, id)
    }

    async fn session_by_id(&self, id: &str, signal: &CallSignal) -> StorageResult<Option<Session>> {
        let conn = self.read_connection(signal)?;
        let _watch = watch(&conn, signal);
        select_session(&conn, id)
    }

    async fn list_users(&self, page: Page, signal: &CallSignal) -> StorageResult<Vec<User>> {
        let conn = self.read_connection(signal)?;
        let _watch = watch(&conn, signal);
        select_users(&conn, page)
    }

    async fn count_users(&self, signal: &CallSignal) -> StorageResult<u64> {
        let conn = self.read_connection(signal)?;
        let _watch = watch(&conn, signal);
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
