//! Database engine for Vessel
//!
//! This crate ties the lower layers together:
//! - Database: shared store, transaction manager and bridge registry
//! - Connection: one thread's view of the store at an advancing version
//! - Record / ResultSet: live, thread-confined entities
//! - Capsule: single-use cross-thread handoff of a live entity
//!
//! Entities never cross threads. A capsule carries an entity's identity
//! instead, pins the source connection's version until it is consumed, and
//! is resolved into a fresh entity on the receiving thread's connection.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bridge;
pub mod capsule;
pub mod connection;
pub mod database;
pub mod id;
pub mod record;
mod resolve;
pub mod results;

pub use bridge::{Bridge, BridgeRegistry, RecordBridge, ResultSetBridge, ThreadConfined};
pub use capsule::{Capsule, CapsuleState, SharedCapsule};
pub use connection::Connection;
pub use database::{Database, DatabaseBuilder, DatabaseConfig};
pub use id::{ConnectionId, DatabaseId};
pub use record::Record;
pub use results::ResultSet;
