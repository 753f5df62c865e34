//! Version pins
//!
//! A connection owns one `VersionPins`. Each outstanding capsule built from
//! that connection holds a `PinGuard`; while any guard is alive the
//! connection refuses to refresh or auto-advance.
//!
//! Pins are reference-counted per version. The first pin of a version takes
//! one store retain so the version stays readable; later pins of the same
//! version share it. Dropping a guard decrements its count exactly once, and
//! the last guard of a version releases the shared retain.
//!
//! Guards are `Send`: a capsule may be resolved or dropped on any thread, so
//! the counters live behind a mutex rather than in the thread-confined
//! connection itself.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use vessel_core::Version;
use vessel_storage::{RetainGuard, StoreSnapshot};

struct PinEntry {
    count: usize,
    _hold: RetainGuard,
}

/// Reference-counted pins owned by one connection
#[derive(Default)]
pub struct VersionPins {
    entries: Mutex<BTreeMap<Version, PinEntry>>,
}

impl VersionPins {
    /// Create an empty pin set
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Pin the version of `snapshot`
    pub fn pin(self: &Arc<Self>, snapshot: &StoreSnapshot) -> PinGuard {
        let version = snapshot.version();
        let mut entries = self.entries.lock();
        let entry = entries.entry(version).or_insert_with(|| PinEntry {
            count: 0,
            _hold: snapshot.retain(),
        });
        entry.count += 1;
        debug!(version = %version, count = entry.count, "pinned version");

        PinGuard {
            pins: Arc::clone(self),
            version,
        }
    }

    fn release(&self, version: Version) {
        // The retain is dropped after the pin lock is released
        let released = {
            let mut entries = self.entries.lock();
            match entries.get_mut(&version) {
                Some(entry) if entry.count > 1 => {
                    entry.count -= 1;
                    debug!(version = %version, count = entry.count, "unpinned version");
                    None
                }
                Some(_) => entries.remove(&version),
                None => {
                    debug_assert!(false, "released pin on {} that was not held", version);
                    None
                }
            }
        };
        if released.is_some() {
            debug!(version = %version, "last pin released");
        }
    }

    /// Check if any version is pinned
    pub fn is_pinned(&self) -> bool {
        !self.entries.lock().is_empty()
    }

    /// Total outstanding pins across all versions
    pub fn count(&self) -> usize {
        self.entries.lock().values().map(|e| e.count).sum()
    }

    /// Outstanding pins on one version
    pub fn count_at(&self, version: Version) -> usize {
        self.entries
            .lock()
            .get(&version)
            .map_or(0, |e| e.count)
    }

    /// Pinned versions, oldest first
    pub fn pinned_versions(&self) -> Vec<Version> {
        self.entries.lock().keys().copied().collect()
    }
}

impl std::fmt::Debug for VersionPins {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_map()
            .entries(entries.iter().map(|(v, e)| (v, e.count)))
            .finish()
    }
}

/// One pin on one version
///
/// Released when dropped.
pub struct PinGuard {
    pins: Arc<VersionPins>,
    version: Version,
}

impl PinGuard {
    /// Pinned version
    pub fn version(&self) -> Version {
        self.version
    }

    /// Release now; same as dropping
    pub fn release(self) {}
}

impl Drop for PinGuard {
    fn drop(&mut self) {
        self.pins.release(self.version);
    }
}

impl std::fmt::Debug for PinGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinGuard")
            .field("version", &self.version)
            .finish()
    }
}
