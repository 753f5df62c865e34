//! Point-in-time view of the store
//!
//! A `StoreSnapshot` reads the store as of one committed version. It is
//! cheap to create (an `Arc` clone and one retention entry) and cheap to
//! clone (clones share the hold). While any clone is alive the version is
//! retained, so garbage collection cannot reclaim what it reads.
//!
//! # Snapshot Isolation Guarantees
//!
//! - Committed data as of `version`
//! - Repeatable reads: the same key returns the same entry
//! - Never shows commits newer than `version`

use std::sync::Arc;
use vessel_core::{Error, Key, Result, Version};

use crate::retention::RetainGuard;
use crate::store::Store;
use crate::stored_value::StoredRow;

/// Immutable view of the store at one version
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    version: Version,
    hold: Arc<RetainGuard>,
}

impl StoreSnapshot {
    pub(crate) fn new(hold: RetainGuard) -> Self {
        Self {
            version: hold.version(),
            hold: Arc::new(hold),
        }
    }

    /// Snapshot version
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Underlying store
    #[inline]
    pub fn store(&self) -> &Arc<Store> {
        self.hold.store()
    }

    /// Take an independent hold on this snapshot's version
    ///
    /// The returned guard keeps the version readable even after every clone
    /// of this snapshot is gone.
    pub fn retain(&self) -> RetainGuard {
        self.hold.duplicate()
    }

    /// Live row for `key`, or `None` if absent, deleted, or its table does
    /// not exist at this version
    pub fn get(&self, key: &Key) -> Option<StoredRow> {
        self.store()
            .get_at(key, self.version)
            .filter(|e| !e.is_tombstone())
    }

    /// Live rows of `table`, sorted by id
    pub fn scan(&self, table: &str) -> Result<Vec<(Key, StoredRow)>> {
        self.store()
            .scan_at(table, self.version)
            .ok_or_else(|| Error::TableNotFound(table.to_string()))
    }

    /// Check if `table` exists at this version
    pub fn table_exists(&self, table: &str) -> bool {
        self.store().table_exists_at(table, self.version)
    }

    /// Check if this snapshot is behind the latest commit
    pub fn is_stale(&self) -> bool {
        self.version < self.store().current_version()
    }
}
