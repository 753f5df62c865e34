//! Database: the shared, thread-safe side of the store
//!
//! A `Database` owns the versioned store, the transaction manager and the
//! bridge registry. It is `Send + Sync` and shared as `Arc<Database>`.
//! Threads never read through it directly; each thread opens its own
//! `Connection`, which observes an independent snapshot of the store.

mod builder;
mod config;

pub use builder::DatabaseBuilder;
pub use config::DatabaseConfig;

use std::sync::Arc;
use tracing::{debug, info};
use vessel_concurrency::{Transaction, TransactionManager};
use vessel_core::{EntityKind, Result, Version};
use vessel_storage::{Store, StoreSnapshot};

use crate::bridge::{Bridge, BridgeRegistry};
use crate::connection::Connection;
use crate::id::DatabaseId;

/// In-memory versioned database
pub struct Database {
    id: DatabaseId,
    store: Arc<Store>,
    manager: TransactionManager,
    bridges: BridgeRegistry,
    config: DatabaseConfig,
}

impl Database {
    /// Create a database with `config`
    pub fn new(config: DatabaseConfig) -> Arc<Self> {
        let bridges = if config.register_default_bridges {
            BridgeRegistry::with_defaults()
        } else {
            BridgeRegistry::new()
        };
        let db = Arc::new(Self {
            id: DatabaseId::new(),
            store: Arc::new(Store::new()),
            manager: TransactionManager::new(),
            bridges,
            config,
        });
        info!(
            target: "vessel::db",
            database = %db.id,
            auto_refresh = db.config.auto_refresh,
            bridges = db.bridges.len(),
            "Created database"
        );
        db
    }

    /// Create a database with the default configuration
    pub fn ephemeral() -> Arc<Self> {
        Self::new(DatabaseConfig::default())
    }

    /// Create a database from TOML configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration does not parse.
    pub fn from_toml(content: &str) -> Result<Arc<Self>> {
        Ok(Self::new(DatabaseConfig::from_toml_str(content)?))
    }

    /// Builder for a database
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Open a connection at the latest version
    ///
    /// The connection is confined to the calling thread.
    pub fn connect(self: &Arc<Self>) -> Connection {
        Connection::open(Arc::clone(self))
    }

    /// Database identifier
    pub fn id(&self) -> DatabaseId {
        self.id
    }

    /// Configuration the database was created with
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Latest committed version
    pub fn current_version(&self) -> Version {
        self.store.current_version()
    }

    /// Register a bridge for its entity kind, replacing any existing one
    ///
    /// Returns `true` if a bridge for the kind was already registered.
    pub fn register_bridge<B: Bridge>(&self, bridge: B) -> bool {
        self.bridges.register(bridge)
    }

    /// Check if capsules of `kind` can be constructed
    pub fn supports(&self, kind: EntityKind) -> bool {
        self.bridges.contains(kind)
    }

    /// Reclaim history no snapshot or pin can still read
    ///
    /// Returns the number of version entries removed.
    pub fn collect_garbage(&self) -> usize {
        self.store.collect_garbage()
    }

    /// Versions currently retained by snapshots and pins, with hold counts
    pub fn retained_versions(&self) -> Vec<(Version, usize)> {
        self.store.retained_versions()
    }

    /// Total version entries held by the store
    pub fn total_entries(&self) -> usize {
        self.store.total_entries()
    }

    pub(crate) fn bridges(&self) -> &BridgeRegistry {
        &self.bridges
    }

    pub(crate) fn latest_snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }

    pub(crate) fn commit(&self, txn: Transaction) -> Result<StoreSnapshot> {
        let snapshot = self.manager.commit(txn, &self.store)?;
        debug!(target: "vessel::db", database = %self.id, version = %snapshot.version(), "Committed");
        Ok(snapshot)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("id", &self.id)
            .field("version", &self.current_version())
            .field("config", &self.config)
            .finish()
    }
}
