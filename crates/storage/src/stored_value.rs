//! Storage-layer row wrapper
//!
//! One entry of a version chain: the row as committed at one version, or a
//! tombstone recording that the record was deleted at that version.
//! Tombstones keep deletes visible to MVCC readers; an older snapshot still
//! sees the row, a newer one sees nothing.

use chrono::{DateTime, Utc};
use vessel_core::{Row, Version};

/// A committed row or tombstone
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    /// `None` marks a delete
    row: Option<Row>,
    version: Version,
    committed_at: DateTime<Utc>,
}

impl StoredRow {
    /// Create a live row entry
    pub fn live(row: Row, version: Version, committed_at: DateTime<Utc>) -> Self {
        StoredRow {
            row: Some(row),
            version,
            committed_at,
        }
    }

    /// Create a tombstone entry
    pub fn tombstone(version: Version, committed_at: DateTime<Utc>) -> Self {
        StoredRow {
            row: None,
            version,
            committed_at,
        }
    }

    /// The row, unless this is a tombstone
    #[inline]
    pub fn row(&self) -> Option<&Row> {
        self.row.as_ref()
    }

    /// Consume and return the row
    #[inline]
    pub fn into_row(self) -> Option<Row> {
        self.row
    }

    /// Commit version of this entry
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Commit time of this entry
    #[inline]
    pub fn committed_at(&self) -> DateTime<Utc> {
        self.committed_at
    }

    /// Check if this entry records a delete
    #[inline]
    pub fn is_tombstone(&self) -> bool {
        self.row.is_none()
    }
}
