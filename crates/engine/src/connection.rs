//! Thread-confined connections
//!
//! A `Connection` is one thread's view of the database. It holds a snapshot
//! at some version and reads everything through it; other threads'
//! commits become visible only when the connection advances.
//!
//! Advancing happens on `refresh`, automatically before `find`, `objects`,
//! `query` and `resolve` (when `auto_refresh` is on), and when the
//! connection commits a write. While capsules built from this connection
//! are outstanding the connection is pinned: refreshes are deferred and a
//! write that would first have to advance fails with `VersionPinned`.
//!
//! Connections are `Rc`-based and therefore neither `Send` nor `Sync`.
//! Cloning a connection yields another handle to the same connection.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;
use vessel_concurrency::{Transaction, VersionPins};
use vessel_core::{Error, Key, Query, Result, Version};
use vessel_storage::StoreSnapshot;

use crate::database::Database;
use crate::id::ConnectionId;
use crate::record::Record;
use crate::results::ResultSet;

struct ConnectionInner {
    id: ConnectionId,
    db: Arc<Database>,
    /// `None` once closed
    snapshot: RefCell<Option<StoreSnapshot>>,
    /// Last version observed, kept after close
    version: Cell<Version>,
    pins: Arc<VersionPins>,
}

/// One thread's connection to a database
#[derive(Clone)]
pub struct Connection {
    inner: Rc<ConnectionInner>,
}

impl Connection {
    pub(crate) fn open(db: Arc<Database>) -> Self {
        let snapshot = db.latest_snapshot();
        let version = snapshot.version();
        let conn = Connection {
            inner: Rc::new(ConnectionInner {
                id: ConnectionId::new(),
                db,
                snapshot: RefCell::new(Some(snapshot)),
                version: Cell::new(version),
                pins: VersionPins::new(),
            }),
        };
        debug!(target: "vessel::conn", connection = %conn.id(), version = %version, "Opened connection");
        conn
    }

    /// Connection identifier
    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    /// Database this connection belongs to
    pub fn database(&self) -> &Arc<Database> {
        &self.inner.db
    }

    /// Version this connection currently observes
    pub fn version(&self) -> Version {
        self.inner.version.get()
    }

    /// Check if outstanding capsules pin this connection
    pub fn is_pinned(&self) -> bool {
        self.inner.pins.is_pinned()
    }

    /// Number of outstanding capsules built from this connection
    pub fn pin_count(&self) -> usize {
        self.inner.pins.count()
    }

    /// Check if this and `other` are handles to the same connection
    pub fn same_connection(&self, other: &Connection) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Close the connection. Idempotent.
    ///
    /// Entities bound to it become invalid. Capsules already built from it
    /// stay resolvable elsewhere.
    pub fn close(&self) {
        if self.inner.snapshot.borrow_mut().take().is_some() {
            debug!(target: "vessel::conn", connection = %self.id(), "Closed connection");
        }
    }

    /// Check if the connection is closed
    pub fn is_closed(&self) -> bool {
        self.inner.snapshot.borrow().is_none()
    }

    /// Advance to the latest committed version
    ///
    /// Returns `false` without doing anything when the connection is pinned
    /// or already current.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConnectionClosed` on a closed connection.
    pub fn refresh(&self) -> Result<bool> {
        let current = self.snapshot()?.version();
        if self.is_pinned() {
            debug!(
                target: "vessel::conn",
                connection = %self.id(),
                version = %current,
                pins = self.pin_count(),
                "Refresh deferred while pinned"
            );
            return Ok(false);
        }
        if self.inner.db.current_version() == current {
            return Ok(false);
        }

        self.install(self.inner.db.latest_snapshot());
        if self.inner.db.config().gc_on_refresh {
            self.inner.db.collect_garbage();
        }
        Ok(true)
    }

    /// Advance before a read when `auto_refresh` is on
    fn auto_refresh(&self) -> Result<()> {
        if self.inner.db.config().auto_refresh {
            self.refresh()?;
        }
        Ok(())
    }

    /// Run `f` in a transaction on the latest version and commit it
    ///
    /// The committed version becomes this connection's version. If `f`
    /// returns an error nothing is committed.
    ///
    /// # Errors
    ///
    /// - `Error::VersionPinned` if the connection is pinned behind the
    ///   latest version
    /// - `Error::Conflict` if a key read in `f` was committed concurrently
    /// - any error returned by `f`
    pub fn write<R>(&self, f: impl FnOnce(&mut Transaction) -> Result<R>) -> Result<R> {
        let base = self.snapshot()?;
        if base.version() < self.inner.db.current_version() {
            if self.is_pinned() {
                return Err(Error::VersionPinned {
                    version: base.version(),
                });
            }
            self.refresh()?;
        }

        let mut txn = Transaction::new(self.snapshot()?);
        let result = f(&mut txn)?;
        if txn.is_empty() {
            return Ok(result);
        }
        let committed = self.inner.db.commit(txn)?;
        self.install(committed);
        Ok(result)
    }

    /// Find one record, advancing first when `auto_refresh` is on
    ///
    /// # Errors
    ///
    /// Returns `Error::TableNotFound` if the table does not exist.
    pub fn find(&self, table: &str, id: &str) -> Result<Option<Record>> {
        self.auto_refresh()?;
        if !self.snapshot()?.table_exists(table) {
            return Err(Error::TableNotFound(table.to_string()));
        }
        self.lookup(&Key::new(table, id))
    }

    /// All records of a table as a live result set
    pub fn objects(&self, table: &str) -> Result<ResultSet> {
        self.query(Query::table(table))
    }

    /// Live result set for `query`
    ///
    /// # Errors
    ///
    /// Returns `Error::TableNotFound` if the table does not exist.
    pub fn query(&self, query: Query) -> Result<ResultSet> {
        self.auto_refresh()?;
        let table = query.table.clone();
        self.evaluate(query)?
            .ok_or(Error::TableNotFound(table))
    }

    /// Record for `key` at the current version, without advancing
    ///
    /// Returns `Ok(None)` if the record or its table does not exist.
    pub fn lookup(&self, key: &Key) -> Result<Option<Record>> {
        let snapshot = self.snapshot()?;
        Ok(snapshot
            .get(key)
            .map(|_| Record::managed(self.clone(), key.clone())))
    }

    /// Result set for `query` at the current version, without advancing
    ///
    /// Returns `Ok(None)` if the table does not exist.
    pub fn evaluate(&self, query: Query) -> Result<Option<ResultSet>> {
        let snapshot = self.snapshot()?;
        if !snapshot.table_exists(&query.table) {
            return Ok(None);
        }
        Ok(Some(ResultSet::new(self.clone(), query)))
    }

    pub(crate) fn snapshot(&self) -> Result<StoreSnapshot> {
        self.inner
            .snapshot
            .borrow()
            .clone()
            .ok_or(Error::ConnectionClosed)
    }

    pub(crate) fn pins(&self) -> &Arc<VersionPins> {
        &self.inner.pins
    }

    /// Replace the snapshot. No-op on a closed connection.
    fn install(&self, snapshot: StoreSnapshot) {
        let mut slot = self.inner.snapshot.borrow_mut();
        if let Some(current) = slot.as_mut() {
            let from = current.version();
            let to = snapshot.version();
            *current = snapshot;
            self.inner.version.set(to);
            debug!(target: "vessel::conn", connection = %self.inner.id, from = %from, to = %to, "Advanced");
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("version", &self.version())
            .field("pins", &self.inner.pins)
            .field("closed", &self.is_closed())
            .finish()
    }
}
