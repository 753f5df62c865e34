//! Concurrency layer for Vessel
//!
//! This crate implements:
//! - Transaction: buffered writes with a tracked read set
//! - TransactionManager: first-committer-wins validation and atomic apply
//! - VersionPins: connection-owned, reference-counted version pins

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod manager;
pub mod pin;
pub mod transaction;
pub mod validation;

pub use manager::TransactionManager;
pub use pin::{PinGuard, VersionPins};
pub use transaction::Transaction;
pub use validation::validate_transaction;
