//! Storage layer for Vessel
//!
//! This crate implements the multi-version in-memory store:
//! - Store: DashMap of tables, FxHashMap of version chains per table
//! - Table generations (create/drop without disturbing older snapshots)
//! - Tombstones for deletes
//! - StoreSnapshot: point-in-time reads at one version
//! - Retention: reference-counted holds that bound garbage collection

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod retention;
pub mod snapshot;
pub mod store;
pub mod stored_value;

pub use retention::RetainGuard;
pub use snapshot::StoreSnapshot;
pub use store::{Op, Store, Table, VersionChain};
pub use stored_value::StoredRow;
