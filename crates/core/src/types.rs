//! Core types for Vessel
//!
//! This module defines the foundational addressing type:
//! - Key: Composite record key (table + id)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical identity of a record: the table it lives in and its primary id.
///
/// A key is stable across versions. A record that is deleted and later
/// re-inserted under the same id is the same logical record.
///
/// Keys order by table first, then id, so a range over one table is contiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    /// Table name
    pub table: String,
    /// Primary id within the table
    pub id: String,
}

impl Key {
    /// Create a new key
    pub fn new(table: impl Into<String>, id: impl Into<String>) -> Self {
        Key {
            table: table.into(),
            id: id.into(),
        }
    }

    /// Check whether this key belongs to `table`
    pub fn in_table(&self, table: &str) -> bool {
        self.table == table
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.table, self.id)
    }
}
