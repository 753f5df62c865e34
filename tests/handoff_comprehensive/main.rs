//! Cross-crate handoff tests
//!
//! Every test drives the public API only: databases, connections, live
//! entities and capsules, with real threads where a handoff crosses one.

mod common;

mod cross_thread;
mod deletion;
mod properties;
mod single_use;
mod unsupported_kind;
mod version_pinning;
