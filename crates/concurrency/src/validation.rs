//! Transaction validation for OCC
//!
//! First-committer-wins on the READ set:
//! - A key read at version V conflicts if its latest committed version is no
//!   longer V (including being deleted, or appearing when it was absent)
//! - Blind writes (write without read) do NOT conflict
//! - Write skew is allowed

use vessel_core::{Error, Result, Version};
use vessel_storage::Store;

use crate::transaction::Transaction;

/// Validate `txn` against the latest state of `store`.
///
/// Must run under the commit lock so nothing commits between validation and
/// apply. Returns the first conflict found; keys are checked in key order so
/// the reported conflict is deterministic.
pub fn validate_transaction(txn: &Transaction, store: &Store) -> Result<()> {
    let mut reads: Vec<_> = txn.read_set().iter().collect();
    reads.sort_by(|(a, _), (b, _)| a.cmp(b));

    for (key, read_version) in reads {
        let current = store.latest_version_of(key);
        if current != *read_version {
            return Err(Error::Conflict {
                key: key.clone(),
                read_version: read_version.unwrap_or(Version::ZERO),
                current_version: current.unwrap_or(Version::ZERO),
            });
        }
    }
    Ok(())
}
