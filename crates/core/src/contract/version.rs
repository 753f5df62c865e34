//! Commit version identifier
//!
//! Every committed transaction produces exactly one version. Every snapshot
//! observes exactly one version. Versions are totally ordered and start at
//! zero (the empty store).

use serde::{Deserialize, Serialize};

/// Commit version of the store
///
/// ## Invariants
///
/// - Versions are monotonically increasing
/// - All writes in one transaction share one version
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Version(u64);

impl Version {
    /// Version of an empty store
    pub const ZERO: Version = Version(0);

    /// Create a version
    pub const fn new(v: u64) -> Self {
        Version(v)
    }

    /// Get the numeric value
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Next version
    #[inline]
    pub const fn increment(&self) -> Self {
        Version(self.0 + 1)
    }

    /// Check if this is the initial version
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<u64> for Version {
    #[inline]
    fn from(v: u64) -> Self {
        Version(v)
    }
}
