//! Core types for Vessel
//!
//! This crate defines the foundational types used throughout the system:
//! - Key: Logical record identity (table + id)
//! - Value / Row: Field values and the rows that hold them
//! - Version: Commit version of the store
//! - EntityKind: Kind tag of thread-confined entities
//! - Payload: Opaque identity token carried across threads
//! - Query / Filter: Plain-data query definitions
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod contract;
pub mod error;
pub mod query;
pub mod types;
pub mod value;

pub use contract::{EntityKind, Payload, Version};
pub use error::{Error, Result};
pub use query::{Filter, Query, SortBy};
pub use types::Key;
pub use value::{Row, Value};
