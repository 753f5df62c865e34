//! Capsules: single-use carriers for cross-thread handoff
//!
//! A capsule is built from one live, thread-confined entity. It holds only
//! what another connection needs to find the same logical entity again:
//! the kind tag and an opaque identity payload produced by the kind's
//! bridge. It does not keep the entity or its connection alive.
//!
//! Building a capsule pins the source connection at its current version.
//! The pin is released exactly once, when the capsule is resolved or
//! discarded, whichever happens first.
//!
//! # State machine
//!
//! ```text
//! Unconsumed --resolve, found------> Resolved
//! Unconsumed --resolve, not found--> Absent
//! Unconsumed --discard / drop------> Abandoned
//! ```
//!
//! All three outcomes are terminal. The transition out of `Unconsumed` is
//! one compare-and-swap, so only the first resolve or discard wins even
//! when several threads race on a `SharedCapsule`.

use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::debug;
use vessel_concurrency::PinGuard;
use vessel_core::{EntityKind, Error, Payload, Result, Version};

use crate::bridge::ThreadConfined;
use crate::id::{ConnectionId, DatabaseId};

/// Lifecycle state of a capsule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CapsuleState {
    /// Not yet resolved or discarded
    Unconsumed = 0,
    /// Resolved to a live entity
    Resolved = 1,
    /// Resolved, but the entity did not exist at the target
    Absent = 2,
    /// Discarded without resolving
    Abandoned = 3,
}

impl CapsuleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => CapsuleState::Unconsumed,
            1 => CapsuleState::Resolved,
            2 => CapsuleState::Absent,
            3 => CapsuleState::Abandoned,
            other => unreachable!("invalid capsule state {other}"),
        }
    }

    /// Check if the capsule can no longer be resolved
    pub fn is_consumed(&self) -> bool {
        *self != CapsuleState::Unconsumed
    }
}

/// Shared state of one capsule
pub(crate) struct CapsuleInner {
    pub(crate) kind: EntityKind,
    pub(crate) payload: Payload,
    pub(crate) database: DatabaseId,
    pub(crate) source_connection: ConnectionId,
    pub(crate) source_version: Version,
    state: AtomicU8,
    pin: Mutex<Option<PinGuard>>,
}

impl CapsuleInner {
    /// Move out of `Unconsumed`. Only one caller ever succeeds.
    ///
    /// A claimed capsule reports `Resolved` until `finish` records the
    /// final outcome.
    pub(crate) fn claim(&self) -> Result<()> {
        self.state
            .compare_exchange(
                CapsuleState::Unconsumed as u8,
                CapsuleState::Resolved as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|_| Error::AlreadyResolved { kind: self.kind })
    }

    /// Record the outcome of a claimed resolve and release the pin
    pub(crate) fn finish(&self, outcome: CapsuleState) {
        self.state.store(outcome as u8, Ordering::Release);
        self.release_pin();
    }

    fn abandon(&self) -> bool {
        let won = self
            .state
            .compare_exchange(
                CapsuleState::Unconsumed as u8,
                CapsuleState::Abandoned as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if won {
            self.release_pin();
            debug!(
                target: "vessel::capsule",
                kind = %self.kind,
                source_version = %self.source_version,
                "Discarded capsule"
            );
        }
        won
    }

    fn release_pin(&self) {
        let pin = self.pin.lock().take();
        drop(pin);
    }

    fn state(&self) -> CapsuleState {
        CapsuleState::from_u8(self.state.load(Ordering::Acquire))
    }
}

impl Drop for CapsuleInner {
    fn drop(&mut self) {
        // Last handle gone without a resolve
        self.abandon();
    }
}

/// Transportable, single-use handle to a thread-confined entity
///
/// `Capsule<T>` is `Send` even though `T` is not: it carries only the
/// entity's identity, never the entity. Resolving takes the capsule by
/// value, so one capsule value can be resolved at most once. Dropping an
/// unresolved capsule discards it.
pub struct Capsule<T: ThreadConfined> {
    pub(crate) inner: Arc<CapsuleInner>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: ThreadConfined> Capsule<T> {
    /// Package `entity` for handoff
    ///
    /// # Errors
    ///
    /// - `Error::InvalidEntity` if the entity is unmanaged, its connection
    ///   is closed, or it is no longer valid
    /// - `Error::UnsupportedKind` if no bridge is registered for `T::KIND`
    ///
    /// On error no capsule exists and nothing is pinned.
    pub fn new(entity: &T) -> Result<Self> {
        let conn = entity.connection().ok_or_else(|| {
            Error::InvalidEntity(format!("{} is not managed by a connection", T::KIND))
        })?;
        if conn.is_closed() {
            return Err(Error::InvalidEntity(format!(
                "{} belongs to a closed connection",
                T::KIND
            )));
        }
        if !entity.is_valid() {
            return Err(Error::InvalidEntity(format!("{} has been invalidated", T::KIND)));
        }

        let db = conn.database();
        let bridge = db.bridges().get(T::KIND)?;
        let payload = bridge.to_payload(entity)?;

        // Pin last: nothing above may leave a pin behind
        let snapshot = conn.snapshot()?;
        let pin = conn.pins().pin(&snapshot);
        let source_version = pin.version();

        debug!(
            target: "vessel::capsule",
            kind = %T::KIND,
            source_version = %source_version,
            connection = %conn.id(),
            payload_bytes = payload.len(),
            "Created capsule"
        );

        Ok(Capsule {
            inner: Arc::new(CapsuleInner {
                kind: T::KIND,
                payload,
                database: db.id(),
                source_connection: conn.id(),
                source_version,
                state: AtomicU8::new(CapsuleState::Unconsumed as u8),
                pin: Mutex::new(Some(pin)),
            }),
            _entity: PhantomData,
        })
    }

    /// Kind of entity carried
    pub fn kind(&self) -> EntityKind {
        self.inner.kind
    }

    /// Version the source connection was at, and stays pinned at
    pub fn source_version(&self) -> Version {
        self.inner.source_version
    }

    /// Connection the capsule was built from
    pub fn source_connection(&self) -> ConnectionId {
        self.inner.source_connection
    }

    /// Database the capsule was built from
    pub fn database_id(&self) -> DatabaseId {
        self.inner.database
    }

    /// Current lifecycle state
    pub fn state(&self) -> CapsuleState {
        self.inner.state()
    }

    /// Discard without resolving, releasing the pin
    pub fn discard(self) {
        self.inner.abandon();
    }

    /// Convert into a handle that several threads can hold
    pub fn share(self) -> SharedCapsule<T> {
        SharedCapsule {
            inner: self.inner,
            _entity: PhantomData,
        }
    }
}

impl<T: ThreadConfined> std::fmt::Debug for Capsule<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capsule")
            .field("kind", &self.inner.kind)
            .field("source_version", &self.inner.source_version)
            .field("state", &self.state())
            .finish()
    }
}

/// Cloneable handle to one capsule
///
/// For handing the same capsule to several candidate threads: the first
/// `Connection::resolve_shared` wins and every later attempt fails with
/// `Error::AlreadyResolved`. The capsule is discarded when the last handle
/// is dropped unresolved.
pub struct SharedCapsule<T: ThreadConfined> {
    pub(crate) inner: Arc<CapsuleInner>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: ThreadConfined> SharedCapsule<T> {
    /// Kind of entity carried
    pub fn kind(&self) -> EntityKind {
        self.inner.kind
    }

    /// Version the source connection is pinned at
    pub fn source_version(&self) -> Version {
        self.inner.source_version
    }

    /// Current lifecycle state
    pub fn state(&self) -> CapsuleState {
        self.inner.state()
    }

    /// Discard without resolving
    ///
    /// Returns `true` if this call consumed the capsule.
    pub fn discard(&self) -> bool {
        self.inner.abandon()
    }
}

impl<T: ThreadConfined> Clone for SharedCapsule<T> {
    fn clone(&self) -> Self {
        SharedCapsule {
            inner: Arc::clone(&self.inner),
            _entity: PhantomData,
        }
    }
}

impl<T: ThreadConfined> std::fmt::Debug for SharedCapsule<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCapsule")
            .field("kind", &self.inner.kind)
            .field("source_version", &self.inner.source_version)
            .field("state", &self.state())
            .finish()
    }
}
