//! Live record handles

use chrono::{DateTime, Utc};
use vessel_core::{EntityKind, Error, Key, Result, Row, Value, Version};
use vessel_storage::StoredRow;

use crate::bridge::ThreadConfined;
use crate::connection::Connection;

enum Binding {
    Managed(Connection),
    Detached(Row),
}

/// One record, read through its owning connection
///
/// A managed record holds no data of its own: every read goes to the
/// connection's current snapshot, so it follows the connection as it
/// advances and becomes invalid once the record is deleted or the
/// connection closes.
pub struct Record {
    key: Key,
    binding: Binding,
}

impl Record {
    pub(crate) fn managed(connection: Connection, key: Key) -> Self {
        Record {
            key,
            binding: Binding::Managed(connection),
        }
    }

    /// Free-standing record with no connection
    ///
    /// Detached records cannot be put in a capsule.
    pub fn detached(key: Key, row: Row) -> Self {
        Record {
            key,
            binding: Binding::Detached(row),
        }
    }

    /// Logical identity
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Check if the record is bound to a connection
    pub fn is_managed(&self) -> bool {
        matches!(self.binding, Binding::Managed(_))
    }

    /// Check if `other` is the same logical record of the same database
    pub fn same_record(&self, other: &Record) -> bool {
        if self.key != other.key {
            return false;
        }
        match (&self.binding, &other.binding) {
            (Binding::Managed(a), Binding::Managed(b)) => a.database().id() == b.database().id(),
            (Binding::Detached(_), Binding::Detached(_)) => true,
            _ => false,
        }
    }

    fn stored(&self) -> Result<StoredRow> {
        match &self.binding {
            Binding::Managed(conn) => conn.snapshot()?.get(&self.key).ok_or_else(|| {
                Error::InvalidEntity(format!("record {} no longer exists", self.key))
            }),
            Binding::Detached(_) => Err(Error::InvalidOperation(format!(
                "record {} is detached",
                self.key
            ))),
        }
    }

    /// Current field values
    ///
    /// # Errors
    ///
    /// - `Error::InvalidEntity` if the record was deleted
    /// - `Error::ConnectionClosed` if the owning connection is closed
    pub fn row(&self) -> Result<Row> {
        match &self.binding {
            Binding::Detached(row) => Ok(row.clone()),
            Binding::Managed(_) => self
                .stored()?
                .into_row()
                .ok_or_else(|| Error::InvalidEntity(format!("record {} was deleted", self.key))),
        }
    }

    /// Current value of one field
    pub fn get(&self, field: &str) -> Result<Option<Value>> {
        Ok(self.row()?.get(field).cloned())
    }

    /// Version of the last change to this record, if managed and valid
    pub fn version(&self) -> Option<Version> {
        self.stored().ok().map(|s| s.version())
    }

    /// Commit time of the last change to this record, if managed and valid
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.stored().ok().map(|s| s.committed_at())
    }
}

impl ThreadConfined for Record {
    const KIND: EntityKind = EntityKind::Record;

    fn connection(&self) -> Option<&Connection> {
        match &self.binding {
            Binding::Managed(conn) => Some(conn),
            Binding::Detached(_) => None,
        }
    }

    fn is_valid(&self) -> bool {
        match &self.binding {
            Binding::Managed(_) => self.stored().is_ok(),
            Binding::Detached(_) => true,
        }
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("key", &self.key)
            .field("managed", &self.is_managed())
            .finish()
    }
}
