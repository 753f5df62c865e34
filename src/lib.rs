//! Vessel - thread-confined versioned store with cross-thread handoff
//!
//! Each thread talks to the store through its own [`Connection`], which
//! observes an independent snapshot that advances over time. Live entities
//! ([`Record`], [`ResultSet`]) are bound to their connection and never
//! leave its thread. To hand one to another thread, wrap it in a
//! [`Capsule`], send the capsule, and resolve it on the receiving side.
//!
//! # Quick Start
//!
//! ```ignore
//! use vessel::{Capsule, Database, Key, Row};
//!
//! let db = Database::ephemeral();
//! let conn = db.connect();
//! conn.write(|txn| {
//!     txn.create_table("users")?;
//!     txn.put(Key::new("users", "1"), Row::new().with("name", "Alice"))
//! })?;
//!
//! let record = conn.find("users", "1")?.unwrap();
//! let capsule = Capsule::new(&record)?;
//!
//! let db2 = db.clone();
//! std::thread::spawn(move || {
//!     let conn = db2.connect();
//!     let record = conn.resolve(capsule).unwrap();
//! });
//! ```

pub use vessel_concurrency::{PinGuard, Transaction, VersionPins};
pub use vessel_core::{
    EntityKind, Error, Filter, Key, Payload, Query, Result, Row, SortBy, Value, Version,
};
pub use vessel_engine::*;
pub use vessel_storage::{StoreSnapshot, StoredRow};
