//! SQLite store provider.

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::{ControlStore, StoreProvider, TenantStore};
use crate::error::{BackendError, StorageError, StorageResult, StoreKind, TenantError};
use crate::strategy::{SchemaPerTenantConfig, SchemaPerTenantStrategy};
use crate::tenant::TenantShortName;

use super::control::SqliteControlStore;
use super::schema;
use super::tenant::SqliteTenantStore;

const CONTROL_STORE_NAME: &str = "control";

/// Configuration for SQLite connection pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Maximum number of connections in each pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of idle connections in each pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,

    /// Enable WAL mode for file-backed stores.
    #[serde(default = "default_true")]
    pub enable_wal: bool,

    /// Enable foreign key constraints.
    #[serde(default = "default_true")]
    pub enable_foreign_keys: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_busy_timeout_ms() -> u32 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            enable_wal: true,
            enable_foreign_keys: true,
        }
    }
}

impl SqliteStoreConfig {
    /// Sets the maximum pool size.
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the pool checkout timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout_ms = timeout.as_millis() as u64;
        self
    }
}

/// Where the provider keeps its databases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Shared-cache in-memory databases, private to one provider instance.
    Memory {
        /// Unique prefix separating this provider's databases.
        namespace: Uuid,
    },
    /// One database file per store under this directory.
    Directory(PathBuf),
}

impl StoreLocation {
    /// A fresh in-memory namespace.
    pub fn in_memory() -> Self {
        StoreLocation::Memory {
            namespace: Uuid::new_v4(),
        }
    }

    /// A data directory.
    pub fn directory(path: impl AsRef<Path>) -> Self {
        StoreLocation::Directory(path.as_ref().to_path_buf())
    }

    fn is_memory(&self) -> bool {
        matches!(self, StoreLocation::Memory { .. })
    }

    fn file_path(&self, store_name: &str) -> Option<PathBuf> {
        match self {
            StoreLocation::Memory { .. } => None,
            StoreLocation::Directory(dir) => Some(dir.join(format!("{}.db", store_name))),
        }
    }
}

/// SQLite implementation of [`StoreProvider`].
///
/// Holds one pool for the control store and opens one pool per tenant store
/// on first use. Tenant stores are separate databases named by the
/// [`SchemaPerTenantStrategy`].
pub struct SqliteProvider {
    location: StoreLocation,
    config: SqliteStoreConfig,
    strategy: SchemaPerTenantStrategy,
    control: Arc<SqliteControlStore>,
    tenants: RwLock<HashMap<TenantShortName, Arc<SqliteTenantStore>>>,
}

impl Debug for SqliteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteProvider")
            .field("location", &self.location)
            .field("config", &self.config)
            .field("open_tenant_stores", &self.tenants.read().len())
            .finish_non_exhaustive()
    }
}

impl SqliteProvider {
    /// Creates a provider backed by private in-memory databases.
    pub fn in_memory() -> StorageResult<Self> {
        Self::with_config(
            StoreLocation::in_memory(),
            SqliteStoreConfig::default(),
            SchemaPerTenantConfig::default(),
        )
    }

    /// Opens or creates a provider storing its databases under `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> StorageResult<Self> {
        Self::with_config(
            StoreLocation::directory(dir),
            SqliteStoreConfig::default(),
            SchemaPerTenantConfig::default(),
        )
    }

    /// Creates a provider with custom configuration.
    pub fn with_config(
        location: StoreLocation,
        config: SqliteStoreConfig,
        tenancy: SchemaPerTenantConfig,
    ) -> StorageResult<Self> {
        if let StoreLocation::Directory(dir) = &location {
            std::fs::create_dir_all(dir)?;
        }
        let strategy = SchemaPerTenantStrategy::new(tenancy)?;

        let pool = open_pool(&location, &config, CONTROL_STORE_NAME)?;
        initialize(&pool, StoreKind::Control)?;
        info!(location = ?location, "opened control store");

        Ok(Self {
            control: Arc::new(SqliteControlStore::new(pool)),
            location,
            config,
            strategy,
            tenants: RwLock::new(HashMap::new()),
        })
    }

    /// Returns whether this provider keeps its databases in memory.
    pub fn is_memory(&self) -> bool {
        self.location.is_memory()
    }

    /// Returns the pool configuration.
    pub fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Returns the tenant store naming strategy.
    pub fn strategy(&self) -> &SchemaPerTenantStrategy {
        &self.strategy
    }

    fn open_tenant(&self, short_name: &TenantShortName) -> StorageResult<Arc<SqliteTenantStore>> {
        let mut tenants = self.tenants.write();
        if let Some(store) = tenants.get(short_name) {
            return Ok(Arc::clone(store));
        }

        let store_name = self.strategy.store_name(short_name)?;
        let pool = open_pool(&self.location, &self.config, &store_name)?;
        initialize(&pool, StoreKind::Tenant)?;
        debug!(tenant = short_name.as_str(), store = %store_name, "opened tenant store");

        let store = Arc::new(SqliteTenantStore::new(short_name.clone(), pool));
        tenants.insert(short_name.clone(), Arc::clone(&store));
        Ok(store)
    }
}

#[async_trait]
impl StoreProvider for SqliteProvider {
    fn control(&self) -> Arc<dyn ControlStore> {
        self.control.clone()
    }

    async fn tenant_store(&self, short_name: &TenantShortName) -> StorageResult<Arc<dyn TenantStore>> {
        if let Some(store) = self.tenants.read().get(short_name) {
            return Ok(store.clone() as Arc<dyn TenantStore>);
        }

        let store_name = self.strategy.store_name(short_name)?;
        let exists = self
            .location
            .file_path(&store_name)
            .is_some_and(|path| path.exists());
        if !exists {
            return Err(TenantError::NotFound {
                tenant_id: short_name.to_string(),
            }
            .into());
        }
        let store: Arc<dyn TenantStore> = self.open_tenant(short_name)?;
        Ok(store)
    }

    async fn provision_tenant_store(
        &self,
        short_name: &TenantShortName,
    ) -> StorageResult<Arc<dyn TenantStore>> {
        let store: Arc<dyn TenantStore> = self.open_tenant(short_name)?;
        info!(tenant = short_name.as_str(), "provisioned tenant store");
        Ok(store)
    }

    async fn remove_tenant_store(&self, short_name: &TenantShortName) -> StorageResult<()> {
        let removed = self.tenants.write().remove(short_name);
        drop(removed);

        let store_name = self.strategy.store_name(short_name)?;
        if let Some(path) = self.location.file_path(&store_name) {
            let drop_files = self.strategy.config().drop_on_delete;
            let retired = format!(".deleted-{}", chrono::Utc::now().format("%Y%m%d%H%M%S%f"));
            for suffix in ["", "-wal", "-shm"] {
                let mut file = path.clone().into_os_string();
                file.push(suffix);
                let outcome = if drop_files {
                    std::fs::remove_file(&file)
                } else {
                    let mut target = path.clone().into_os_string();
                    target.push(&retired);
                    target.push(suffix);
                    std::fs::rename(&file, &target)
                };
                match outcome {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        warn!(tenant = short_name.as_str(), error = %e, "failed to remove store file");
                        return Err(e.into());
                    }
                }
            }
            if !drop_files {
                info!(tenant = short_name.as_str(), suffix = %retired, "retained tenant store");
            }
        }
        info!(tenant = short_name.as_str(), "removed tenant store");
        Ok(())
    }
}

fn open_pool(
    location: &StoreLocation,
    config: &SqliteStoreConfig,
    store_name: &str,
) -> StorageResult<Pool<SqliteConnectionManager>> {
    let manager = match location {
        StoreLocation::Memory { namespace } => SqliteConnectionManager::file(format!(
            "file:stratum-{}-{}?mode=memory&cache=shared",
            namespace, store_name
        ))
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        ),
        StoreLocation::Directory(dir) => {
            SqliteConnectionManager::file(dir.join(format!("{}.db", store_name)))
        }
    };

    let busy_timeout = Duration::from_millis(config.busy_timeout_ms as u64);
    let foreign_keys = config.enable_foreign_keys;
    let wal = config.enable_wal && !location.is_memory();
    let manager = manager.with_init(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        if foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON")?;
        }
        if wal {
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })?;
        }
        Ok(())
    });

    let mut builder = Pool::builder()
        .max_size(config.max_connections)
        .connection_timeout(Duration::from_millis(config.connection_timeout_ms));
    builder = if location.is_memory() {
        // the database lives only while a connection is open
        builder
            .min_idle(Some(config.min_connections.max(1)))
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        builder.min_idle(Some(config.min_connections))
    };

    builder.build(manager).map_err(|e| {
        StorageError::Backend(BackendError::ConnectionFailed {
            backend_name: "sqlite".to_string(),
            message: format!("{}: {}", store_name, e),
        })
    })
}

fn initialize(pool: &Pool<SqliteConnectionManager>, kind: StoreKind) -> StorageResult<()> {
    let conn = get_connection(pool, kind)?;
    schema::initialize_schema(&conn, kind)
}

/// Checks a connection out of `pool`.
pub(crate) fn get_connection(
    pool: &Pool<SqliteConnectionManager>,
    store: StoreKind,
) -> StorageResult<PooledConnection<SqliteConnectionManager>> {
    pool.get().map_err(|e| {
        StorageError::Backend(BackendError::ConnectionFailed {
            backend_name: format!("sqlite {} store", store),
            message: e.to_string(),
        })
    })
}
