//! Multi-version table store
//!
//! DashMap keyed by table name, FxHashMap of version chains within a table.
//!
//! # Design
//!
//! - Every write appends to a key's version chain; nothing is overwritten
//! - Deletes append tombstones
//! - Dropping a table ends its current generation; re-creating it starts a
//!   fresh one, so older snapshots keep reading the old rows
//! - Old entries are reclaimed only by `collect_garbage`, and only below the
//!   oldest retained version
//!
//! # Thread Safety
//!
//! Reads are lock-free through DashMap read guards. Writes are applied by
//! `apply`, which callers serialize (the transaction manager holds its commit
//! lock around it). The global version is published after the batch is in
//! place, so a snapshot never observes half a commit.

use chrono::Utc;
use dashmap::DashMap;
use rustc_hash::FxHashMap;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use vessel_core::{Error, Key, Result, Row, Version};

use crate::retention::{RetainGuard, Retention};
use crate::snapshot::StoreSnapshot;
use crate::stored_value::StoredRow;

/// Version chain for MVCC
///
/// Entries are stored newest-first; a read at version `v` takes the first
/// entry whose version is `<= v`.
#[derive(Debug, Clone)]
pub struct VersionChain {
    versions: VecDeque<StoredRow>,
}

impl VersionChain {
    /// Create a chain with a single entry
    pub fn new(entry: StoredRow) -> Self {
        let mut versions = VecDeque::with_capacity(4);
        versions.push_front(entry);
        Self { versions }
    }

    /// Add a newer entry
    #[inline]
    pub fn push(&mut self, entry: StoredRow) {
        debug_assert!(
            self.latest().map_or(true, |e| e.version() < entry.version()),
            "version chain entries must be pushed in commit order"
        );
        self.versions.push_front(entry);
    }

    /// Entry visible at `max_version`
    pub fn get_at_version(&self, max_version: Version) -> Option<&StoredRow> {
        self.versions.iter().find(|e| e.version() <= max_version)
    }

    /// Newest entry
    #[inline]
    pub fn latest(&self) -> Option<&StoredRow> {
        self.versions.front()
    }

    /// Drop entries no reader at or above `horizon` can see.
    ///
    /// Keeps everything newer than `horizon` plus the one entry visible at
    /// `horizon`. Returns the number of entries removed.
    pub fn gc(&mut self, horizon: Version) -> usize {
        let Some(visible) = self.versions.iter().position(|e| e.version() <= horizon) else {
            return 0;
        };
        let before = self.versions.len();
        self.versions.truncate(visible + 1);
        before - self.versions.len()
    }

    /// True when the only remaining entry is a tombstone at or below `horizon`
    pub fn is_dead_at(&self, horizon: Version) -> bool {
        self.versions.len() == 1
            && self
                .versions
                .front()
                .map_or(false, |e| e.is_tombstone() && e.version() <= horizon)
    }

    /// Number of entries stored
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }
}

/// One generation of a table: from its creation until it is dropped
#[derive(Debug)]
pub struct Table {
    created: Version,
    dropped: Option<Version>,
    pub(crate) rows: FxHashMap<String, VersionChain>,
}

impl Table {
    fn new(created: Version) -> Self {
        Self {
            created,
            dropped: None,
            rows: FxHashMap::default(),
        }
    }

    /// Version that created this generation
    pub fn created(&self) -> Version {
        self.created
    }

    /// Version that dropped this generation, if any
    pub fn dropped(&self) -> Option<Version> {
        self.dropped
    }

    /// Check if this generation exists at `version`
    #[inline]
    pub fn visible_at(&self, version: Version) -> bool {
        self.created <= version && self.dropped.map_or(true, |d| version < d)
    }

    fn is_live(&self) -> bool {
        self.dropped.is_none()
    }

    /// Number of keys with at least one entry
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if this generation holds no keys
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Single mutation inside a commit
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Start a new table generation
    CreateTable(String),
    /// End the current table generation
    DropTable(String),
    /// Write a row
    Put(Key, Row),
    /// Write a tombstone
    Delete(Key),
}

/// Multi-version store shared by every connection to one database
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use vessel_storage::{Op, Store};
///
/// let store = Arc::new(Store::new());
/// store.apply(&[Op::CreateTable("users".into())], store.current_version().increment())?;
/// let snapshot = store.snapshot();
/// assert!(snapshot.table_exists("users"));
/// ```
pub struct Store {
    /// Generations per table, oldest first
    tables: DashMap<String, Vec<Table>>,
    /// Latest committed version
    version: AtomicU64,
    /// Versions held by snapshots and pins
    pub(crate) retention: Retention,
}

impl Store {
    /// Create an empty store at version zero
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
            version: AtomicU64::new(0),
            retention: Retention::new(),
        }
    }

    /// Latest committed version
    #[inline]
    pub fn current_version(&self) -> Version {
        Version::new(self.version.load(Ordering::Acquire))
    }

    /// Snapshot at the latest committed version
    ///
    /// The version is read and retained in one step, so garbage collection
    /// cannot reclaim it in between.
    pub fn snapshot(self: &Arc<Self>) -> StoreSnapshot {
        let version = self.retention.retain_with(|| self.current_version());
        StoreSnapshot::new(RetainGuard::adopt(Arc::clone(self), version))
    }

    /// Versions currently held, with their hold counts (oldest first)
    pub fn retained_versions(&self) -> Vec<(Version, usize)> {
        self.retention.versions()
    }

    /// Apply a batch of mutations at `version`
    ///
    /// The batch is validated against the latest state before anything is
    /// written, so it applies completely or not at all. Callers must
    /// serialize calls and pass `current_version().increment()`.
    pub fn apply(&self, ops: &[Op], version: Version) -> Result<()> {
        if version <= self.current_version() {
            return Err(Error::InvalidOperation(format!(
                "commit version {} is not newer than {}",
                version,
                self.current_version()
            )));
        }
        self.validate(ops)?;

        let committed_at = Utc::now();
        for op in ops {
            match op {
                Op::CreateTable(name) => {
                    self.tables
                        .entry(name.clone())
                        .or_default()
                        .push(Table::new(version));
                }
                Op::DropTable(name) => {
                    if let Some(mut gens) = self.tables.get_mut(name) {
                        if let Some(live) = gens.last_mut().filter(|t| t.is_live()) {
                            live.dropped = Some(version);
                        }
                    }
                }
                Op::Put(key, row) => {
                    self.push_entry(key, StoredRow::live(row.clone(), version, committed_at))
                }
                Op::Delete(key) => {
                    self.push_entry(key, StoredRow::tombstone(version, committed_at))
                }
            }
        }

        self.version.store(version.as_u64(), Ordering::Release);
        debug!(version = %version, ops = ops.len(), "applied commit");
        Ok(())
    }

    fn validate(&self, ops: &[Op]) -> Result<()> {
        let mut created: HashSet<&str> = HashSet::new();
        let mut dropped: HashSet<&str> = HashSet::new();
        let live = |name: &str, created: &HashSet<&str>, dropped: &HashSet<&str>| {
            if created.contains(name) {
                return true;
            }
            !dropped.contains(name) && self.table_is_live(name)
        };

        for op in ops {
            match op {
                Op::CreateTable(name) => {
                    if live(name, &created, &dropped) {
                        return Err(Error::TableExists(name.clone()));
                    }
                    dropped.remove(name.as_str());
                    created.insert(name.as_str());
                }
                Op::DropTable(name) => {
                    if !live(name, &created, &dropped) {
                        return Err(Error::TableNotFound(name.clone()));
                    }
                    // A table created and dropped in one batch never existed
                    if created.remove(name.as_str()) {
                        return Err(Error::InvalidOperation(format!(
                            "table {} created and dropped in the same commit",
                            name
                        )));
                    }
                    dropped.insert(name.as_str());
                }
                Op::Put(key, _) | Op::Delete(key) => {
                    if !live(&key.table, &created, &dropped) {
                        return Err(Error::TableNotFound(key.table.clone()));
                    }
                }
            }
        }
        Ok(())
    }

    fn push_entry(&self, key: &Key, entry: StoredRow) {
        if let Some(mut gens) = self.tables.get_mut(&key.table) {
            if let Some(table) = gens.last_mut() {
                if let Some(chain) = table.rows.get_mut(&key.id) {
                    chain.push(entry);
                } else {
                    table.rows.insert(key.id.clone(), VersionChain::new(entry));
                }
            }
        }
    }

    fn table_is_live(&self, name: &str) -> bool {
        self.tables
            .get(name)
            .and_then(|gens| gens.last().map(Table::is_live))
            .unwrap_or(false)
    }

    /// Check if `table` exists at `version`
    pub fn table_exists_at(&self, table: &str, version: Version) -> bool {
        self.tables
            .get(table)
            .map(|gens| gens.iter().any(|t| t.visible_at(version)))
            .unwrap_or(false)
    }

    /// Entry for `key` visible at `version`, tombstones included
    pub fn get_at(&self, key: &Key, version: Version) -> Option<StoredRow> {
        let gens = self.tables.get(&key.table)?;
        let table = gens.iter().rev().find(|t| t.visible_at(version))?;
        table
            .rows
            .get(&key.id)
            .and_then(|chain| chain.get_at_version(version))
            .cloned()
    }

    /// Live rows of `table` at `version`, sorted by id
    ///
    /// Returns `None` if the table does not exist at `version`.
    pub fn scan_at(&self, table: &str, version: Version) -> Option<Vec<(Key, StoredRow)>> {
        let gens = self.tables.get(table)?;
        let generation = gens.iter().rev().find(|t| t.visible_at(version))?;
        let mut rows: Vec<_> = generation
            .rows
            .iter()
            .filter_map(|(id, chain)| {
                chain
                    .get_at_version(version)
                    .filter(|e| !e.is_tombstone())
                    .map(|e| (Key::new(table, id.clone()), e.clone()))
            })
            .collect();
        rows.sort_by(|(a, _), (b, _)| a.cmp(b));
        Some(rows)
    }

    /// Version of the newest entry for `key` in the live table generation
    ///
    /// Tombstones count: a delete is a committed change to the key.
    pub fn latest_version_of(&self, key: &Key) -> Option<Version> {
        let gens = self.tables.get(&key.table)?;
        let table = gens.last()?;
        table
            .rows
            .get(&key.id)
            .and_then(|chain| chain.latest())
            .map(StoredRow::version)
    }

    /// Reclaim history no retained version can read
    ///
    /// The horizon is the oldest retained version, or the current version
    /// when nothing is retained. Returns the number of entries removed.
    pub fn collect_garbage(&self) -> usize {
        let horizon = self.retention.horizon(self.current_version());
        let mut removed = 0;

        for mut gens in self.tables.iter_mut() {
            gens.retain(|t| match t.dropped {
                Some(d) if d <= horizon => {
                    removed += t.rows.values().map(VersionChain::version_count).sum::<usize>();
                    false
                }
                _ => true,
            });
            for table in gens.iter_mut() {
                table.rows.retain(|_, chain| {
                    removed += chain.gc(horizon);
                    if chain.is_dead_at(horizon) {
                        removed += 1;
                        false
                    } else {
                        true
                    }
                });
            }
        }
        self.tables.retain(|_, gens| !gens.is_empty());

        debug!(horizon = %horizon, removed, "collected garbage");
        removed
    }

    /// Total entries across all tables and generations
    pub fn total_entries(&self) -> usize {
        self.tables
            .iter()
            .map(|gens| {
                gens.iter()
                    .flat_map(|t| t.rows.values())
                    .map(VersionChain::version_count)
                    .sum::<usize>()
            })
            .sum()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("tables", &self.tables.len())
            .field("version", &self.current_version())
            .field("total_entries", &self.total_entries())
            .finish()
    }
}
