//! Write transaction for OCC
//!
//! A `Transaction` buffers mutations on top of a base snapshot and tracks the
//! keys it read, so the manager can validate it at commit time.
//!
//! - Reads see the base snapshot overlaid with the transaction's own writes
//! - Point reads record the version observed (the read set)
//! - Blind writes and scans are not recorded; they never conflict
//! - Nothing is visible to anyone else until commit

use std::collections::{BTreeMap, HashMap};
use vessel_core::{Error, Key, Result, Row, Version};
use vessel_storage::{Op, StoreSnapshot};

/// Buffered write transaction
pub struct Transaction {
    snapshot: StoreSnapshot,
    /// Version of each key as observed by point reads (`None` = absent)
    read_set: HashMap<Key, Option<Version>>,
    /// Latest buffered state per key (`None` = deleted)
    write_set: BTreeMap<Key, Option<Row>>,
    /// Table liveness changed by this transaction
    tables: HashMap<String, bool>,
    /// Mutations in the order they were issued
    ops: Vec<Op>,
}

impl Transaction {
    /// Start a transaction on `snapshot`
    pub fn new(snapshot: StoreSnapshot) -> Self {
        Self {
            snapshot,
            read_set: HashMap::new(),
            write_set: BTreeMap::new(),
            tables: HashMap::new(),
            ops: Vec::new(),
        }
    }

    /// Version the transaction reads from
    pub fn base_version(&self) -> Version {
        self.snapshot.version()
    }

    /// Base snapshot
    pub fn snapshot(&self) -> &StoreSnapshot {
        &self.snapshot
    }

    /// Check if `table` exists in this transaction's view
    pub fn table_exists(&self, table: &str) -> bool {
        self.tables
            .get(table)
            .copied()
            .unwrap_or_else(|| self.snapshot.table_exists(table))
    }

    fn require_table(&self, table: &str) -> Result<()> {
        if self.table_exists(table) {
            Ok(())
        } else {
            Err(Error::TableNotFound(table.to_string()))
        }
    }

    /// True if the table was created by this transaction, hiding any base rows
    fn created_here(&self, table: &str) -> bool {
        self.tables.get(table) == Some(&true) && !self.snapshot.table_exists(table)
            || self
                .ops
                .iter()
                .any(|op| matches!(op, Op::DropTable(t) if t == table))
    }

    /// Read a row, recording the observed version
    pub fn get(&mut self, key: &Key) -> Result<Option<Row>> {
        self.require_table(&key.table)?;
        if let Some(buffered) = self.write_set.get(key) {
            return Ok(buffered.clone());
        }
        if self.created_here(&key.table) {
            return Ok(None);
        }

        let observed = self
            .snapshot
            .store()
            .get_at(key, self.snapshot.version())
            .map(|e| e.version());
        self.read_set.entry(key.clone()).or_insert(observed);
        Ok(self.snapshot.get(key).and_then(|e| e.into_row()))
    }

    /// Check if a row exists, without recording a read
    pub fn contains(&self, key: &Key) -> bool {
        match self.write_set.get(key) {
            Some(buffered) => buffered.is_some(),
            None => !self.created_here(&key.table) && self.snapshot.get(key).is_some(),
        }
    }

    /// Buffer a row write
    pub fn put(&mut self, key: Key, row: Row) -> Result<()> {
        self.require_table(&key.table)?;
        self.write_set.insert(key.clone(), Some(row.clone()));
        self.ops.push(Op::Put(key, row));
        Ok(())
    }

    /// Buffer a delete. Returns whether the row existed in this view.
    pub fn delete(&mut self, key: &Key) -> Result<bool> {
        self.require_table(&key.table)?;
        let existed = self.contains(key);
        if existed {
            self.write_set.insert(key.clone(), None);
            self.ops.push(Op::Delete(key.clone()));
        }
        Ok(existed)
    }

    /// Buffer a table creation
    pub fn create_table(&mut self, table: impl Into<String>) -> Result<()> {
        let table = table.into();
        if self.table_exists(&table) {
            return Err(Error::TableExists(table));
        }
        self.tables.insert(table.clone(), true);
        self.ops.push(Op::CreateTable(table));
        Ok(())
    }

    /// Buffer a table drop, discarding buffered writes to it
    pub fn drop_table(&mut self, table: &str) -> Result<()> {
        self.require_table(table)?;
        self.write_set.retain(|k, _| !k.in_table(table));
        self.tables.insert(table.to_string(), false);
        self.ops.push(Op::DropTable(table.to_string()));
        Ok(())
    }

    /// Live rows of `table` in this view, sorted by id
    pub fn scan(&self, table: &str) -> Result<Vec<(Key, Row)>> {
        self.require_table(table)?;
        let mut rows: BTreeMap<Key, Row> = if self.created_here(table) {
            BTreeMap::new()
        } else {
            self.snapshot
                .scan(table)?
                .into_iter()
                .filter_map(|(k, e)| e.into_row().map(|r| (k, r)))
                .collect()
        };
        for (key, buffered) in self.write_set.iter().filter(|(k, _)| k.in_table(table)) {
            match buffered {
                Some(row) => {
                    rows.insert(key.clone(), row.clone());
                }
                None => {
                    rows.remove(key);
                }
            }
        }
        Ok(rows.into_iter().collect())
    }

    /// Check if nothing was written
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Keys read, with the versions observed
    pub fn read_set(&self) -> &HashMap<Key, Option<Version>> {
        &self.read_set
    }

    /// Buffered mutations, in issue order
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub(crate) fn into_parts(self) -> (StoreSnapshot, Vec<Op>) {
        (self.snapshot, self.ops)
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("base_version", &self.base_version())
            .field("reads", &self.read_set.len())
            .field("ops", &self.ops.len())
            .finish()
    }
}
