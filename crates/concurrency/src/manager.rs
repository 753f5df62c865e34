//! Transaction manager for coordinating commit operations
//!
//! Provides atomic commit by orchestrating, under one commit lock:
//!
//! ```text
//! 1. validate_transaction() - first-committer-wins on the read set
//! 2. IF conflict: return error, nothing applied
//! 3. Allocate commit_version (current + 1)
//! 4. Store::apply() - all ops at commit_version, all-or-nothing
//! 5. Snapshot at exactly commit_version
//! ```
//!
//! The snapshot is taken before the lock is released, so the committing
//! connection lands on its own commit and not on a later one.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;
use vessel_core::Result;
use vessel_storage::{Store, StoreSnapshot};

use crate::transaction::Transaction;
use crate::validation::validate_transaction;

/// Serializes commits against one store
#[derive(Debug, Default)]
pub struct TransactionManager {
    commit_lock: Mutex<()>,
}

impl TransactionManager {
    /// Create a new transaction manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a transaction atomically
    ///
    /// # Returns
    /// - Ok(snapshot) at the commit version, or the transaction's base
    ///   snapshot if it wrote nothing (no version is allocated)
    /// - Err(Conflict) if a key in the read set changed since it was read
    /// - Err(TableNotFound / TableExists) if a concurrent commit changed the
    ///   tables this transaction writes to
    pub fn commit(&self, txn: Transaction, store: &Arc<Store>) -> Result<StoreSnapshot> {
        if txn.is_empty() {
            let (base, _) = txn.into_parts();
            return Ok(base);
        }

        let _guard = self.commit_lock.lock();
        validate_transaction(&txn, store)?;

        let (base, ops) = txn.into_parts();
        let commit_version = store.current_version().increment();
        store.apply(&ops, commit_version)?;

        let snapshot = store.snapshot();
        debug_assert_eq!(snapshot.version(), commit_version);
        debug!(
            base_version = %base.version(),
            commit_version = %commit_version,
            ops = ops.len(),
            "committed transaction"
        );
        Ok(snapshot)
    }
}
