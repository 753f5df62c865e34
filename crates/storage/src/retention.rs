//! Version retention
//!
//! Tracks which versions someone can still read. Snapshots and version pins
//! hold a version through a `RetainGuard`; garbage collection never reclaims
//! anything visible at or above the oldest held version.
//!
//! Holds are reference-counted per version: many guards on one version share
//! one entry, and the entry disappears with the last guard.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use vessel_core::Version;

use crate::store::Store;

/// Reference counts of held versions
#[derive(Debug, Default)]
pub(crate) struct Retention {
    counts: Mutex<BTreeMap<Version, usize>>,
}

impl Retention {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Read a version and hold it under one lock acquisition.
    pub(crate) fn retain_with(&self, version: impl FnOnce() -> Version) -> Version {
        let mut counts = self.counts.lock();
        let version = version();
        *counts.entry(version).or_insert(0) += 1;
        version
    }

    fn retain(&self, version: Version) {
        *self.counts.lock().entry(version).or_insert(0) += 1;
    }

    fn release(&self, version: Version) {
        let mut counts = self.counts.lock();
        match counts.get_mut(&version) {
            Some(n) if *n > 1 => *n -= 1,
            Some(_) => {
                counts.remove(&version);
            }
            None => debug_assert!(false, "released version {} that was not held", version),
        }
    }

    /// Oldest version garbage collection must preserve.
    pub(crate) fn horizon(&self, current: Version) -> Version {
        let counts = self.counts.lock();
        counts
            .keys()
            .next()
            .copied()
            .map_or(current, |oldest| oldest.min(current))
    }

    pub(crate) fn versions(&self) -> Vec<(Version, usize)> {
        self.counts.lock().iter().map(|(v, n)| (*v, *n)).collect()
    }
}

/// One hold on one version of a store
///
/// Released exactly once, when dropped.
pub struct RetainGuard {
    store: Arc<Store>,
    version: Version,
}

impl RetainGuard {
    /// Wrap a hold already registered with the store's retention.
    pub(crate) fn adopt(store: Arc<Store>, version: Version) -> Self {
        Self { store, version }
    }

    /// Take an additional hold on the same version
    pub fn duplicate(&self) -> RetainGuard {
        self.store.retention.retain(self.version);
        RetainGuard {
            store: Arc::clone(&self.store),
            version: self.version,
        }
    }

    /// Held version
    pub fn version(&self) -> Version {
        self.version
    }

    /// Store the version belongs to
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }
}

impl Drop for RetainGuard {
    fn drop(&mut self) {
        self.store.retention.release(self.version);
    }
}

impl std::fmt::Debug for RetainGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetainGuard")
            .field("version", &self.version)
            .finish()
    }
}
