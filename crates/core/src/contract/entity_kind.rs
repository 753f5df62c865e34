//! Entity kind tag
//!
//! Every thread-confined entity reports which kind it is. A capsule carries
//! this tag so the resolving side can pick the matching bridge without
//! knowing the concrete entity type up front.
//!
//! | Kind | Entity | Identity |
//! |------|--------|----------|
//! | Record | Single live record | table + id |
//! | ResultSet | Live query result | query definition |
//! | Extension | Third-party entity | bridge-defined |

use std::fmt;

/// Kind of a thread-confined entity
///
/// `Extension` is the open end: integrations that add their own
/// thread-confined types name them here and register a bridge for the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Reference to a single record
    Record,
    /// Live result of a query
    ResultSet,
    /// Kind added outside this crate
    Extension(&'static str),
}

impl EntityKind {
    /// Built-in kinds (for iteration)
    pub const BUILTIN: [EntityKind; 2] = [EntityKind::Record, EntityKind::ResultSet];

    /// Short identifier, used in logs and error messages
    pub const fn name(&self) -> &'static str {
        match self {
            EntityKind::Record => "record",
            EntityKind::ResultSet => "result_set",
            EntityKind::Extension(name) => name,
        }
    }

    /// Check if this kind ships with the engine
    pub const fn is_builtin(&self) -> bool {
        !matches!(self, EntityKind::Extension(_))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
