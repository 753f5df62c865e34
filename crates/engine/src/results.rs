//! Live query results
//!
//! A `ResultSet` keeps the query, not the rows. Each call evaluates the
//! query against the owning connection's current snapshot, so the set
//! follows the connection as it advances.

use vessel_core::{EntityKind, Key, Query, Result};

use crate::bridge::ThreadConfined;
use crate::connection::Connection;
use crate::record::Record;

/// Live result of a query on one connection
pub struct ResultSet {
    connection: Connection,
    query: Query,
}

impl ResultSet {
    pub(crate) fn new(connection: Connection, query: Query) -> Self {
        ResultSet { connection, query }
    }

    /// Query definition
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Keys of matching records, in result order
    ///
    /// # Errors
    ///
    /// - `Error::TableNotFound` if the table was dropped
    /// - `Error::ConnectionClosed` if the owning connection is closed
    pub fn keys(&self) -> Result<Vec<Key>> {
        let rows = self
            .connection
            .snapshot()?
            .scan(&self.query.table)?
            .into_iter()
            .filter_map(|(key, stored)| stored.into_row().map(|row| (key, row)))
            .collect();
        Ok(self
            .query
            .evaluate(rows)
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }

    /// Number of matching records
    pub fn len(&self) -> Result<usize> {
        Ok(self.keys()?.len())
    }

    /// Check if nothing matches
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Record at `index` in result order
    pub fn get(&self, index: usize) -> Result<Option<Record>> {
        Ok(self
            .keys()?
            .into_iter()
            .nth(index)
            .map(|key| Record::managed(self.connection.clone(), key)))
    }

    /// All matching records
    pub fn records(&self) -> Result<Vec<Record>> {
        Ok(self
            .keys()?
            .into_iter()
            .map(|key| Record::managed(self.connection.clone(), key))
            .collect())
    }
}

impl ThreadConfined for ResultSet {
    const KIND: EntityKind = EntityKind::ResultSet;

    fn connection(&self) -> Option<&Connection> {
        Some(&self.connection)
    }

    fn is_valid(&self) -> bool {
        self.connection
            .snapshot()
            .map(|s| s.table_exists(&self.query.table))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSet")
            .field("query", &self.query)
            .finish()
    }
}
