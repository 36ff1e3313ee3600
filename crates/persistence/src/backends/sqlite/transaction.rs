//! Transaction support for the SQLite backend.

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{trace, warn};

use crate::core::CallSignal;
use crate::error::{StorageError, StorageResult, StoreKind, TransactionError};

/// Interrupts `conn`'s running statement when `signal` fires.
///
/// The watcher stops when the returned guard is dropped. Outside a tokio
/// runtime no watcher is spawned and cancellation is only observed between
/// statements.
pub(crate) fn watch(conn: &Connection, signal: &CallSignal) -> Option<DropGuard> {
    let runtime = tokio::runtime::Handle::try_current().ok()?;
    let interrupt = conn.get_interrupt_handle();
    let stop = CancellationToken::new();
    let stopped = stop.clone();
    let signal = signal.clone();
    runtime.spawn(async move {
        tokio::select! {
            _ = stopped.cancelled() => {}
            reason = signal.done() => {
                trace!(reason = %reason, "interrupting in-flight statement");
                interrupt.interrupt();
            }
        }
    });
    Some(stop.drop_guard())
}

/// An open `BEGIN IMMEDIATE` transaction on a pooled connection.
///
/// Dropped while still active, it rolls back.
pub(crate) struct SqliteTx {
    conn: PooledConnection<SqliteConnectionManager>,
    store: StoreKind,
    signal: CallSignal,
    active: bool,
    _watch: Option<DropGuard>,
}

impl std::fmt::Debug for SqliteTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTx")
            .field("store", &self.store)
            .field("active", &self.active)
            .finish()
    }
}

impl SqliteTx {
    pub(crate) fn begin(
        conn: PooledConnection<SqliteConnectionManager>,
        store: StoreKind,
        signal: &CallSignal,
    ) -> StorageResult<Self> {
        signal.check()?;
        conn.execute_batch("BEGIN IMMEDIATE").map_err(|e| {
            StorageError::Transaction(TransactionError::BeginFailed {
                store,
                reason: e.to_string(),
            })
        })?;
        let watch = watch(&conn, signal);
        Ok(Self {
            conn,
            store,
            signal: signal.clone(),
            active: true,
            _watch: watch,
        })
    }

    /// Returns the connection for the next statement, failing if the
    /// transaction is finished or the call was cancelled.
    pub(crate) fn conn(&self) -> StorageResult<&Connection> {
        if !self.active {
            return Err(TransactionError::InvalidTransaction.into());
        }
        self.signal.check()?;
        Ok(&self.conn)
    }

    pub(crate) fn commit(&mut self) -> StorageResult<()> {
        self.conn()?;
        self.conn.execute_batch("COMMIT").map_err(|e| {
            StorageError::Transaction(TransactionError::CommitFailed {
                store: self.store,
                reason: e.to_string(),
            })
        })?;
        self.active = false;
        Ok(())
    }

    pub(crate) fn rollback(&mut self) -> StorageResult<()> {
        if !self.active {
            return Err(TransactionError::InvalidTransaction.into());
        }
        self.active = false;
        if self.conn.is_autocommit() {
            // already rolled back by an interrupted statement
            return Ok(());
        }
        self.conn.execute_batch("ROLLBACK").map_err(|e| {
            StorageError::Transaction(TransactionError::RollbackFailed {
                store: self.store,
                reason: e.to_string(),
            })
        })
    }
}

impl Drop for SqliteTx {
    fn drop(&mut self) {
        if self.active && !self.conn.is_autocommit() {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!(store = %self.store, error = %e, "rollback on drop failed");
            }
        }
    }
}
