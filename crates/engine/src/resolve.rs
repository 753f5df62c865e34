//! Resolving capsules on the receiving connection
//!
//! Resolution runs on the thread that owns the target connection:
//!
//! 1. Reject capsules from another database (nothing is consumed)
//! 2. Claim the capsule; a second claim fails with `AlreadyResolved`
//! 3. Bring the target to a version at or after the source version, unless
//!    it is pinned, in which case it stays where it is
//! 4. Re-locate the identity through the kind's bridge
//! 5. Record `Resolved` or `Absent` and release the source pin
//!
//! A closed target, a deleted record and a dropped table all resolve to
//! `Ok(None)`. The pin is released exactly once whatever the outcome.

use std::sync::Arc;
use tracing::{debug, warn};
use vessel_core::{Error, Result};

use crate::bridge::ThreadConfined;
use crate::capsule::{Capsule, CapsuleInner, CapsuleState, SharedCapsule};
use crate::connection::Connection;

impl Connection {
    /// Consume `capsule` and re-create its entity on this connection
    ///
    /// Returns `Ok(None)` if the entity does not exist at this connection's
    /// version, or if this connection is closed.
    ///
    /// # Errors
    ///
    /// - `Error::AlreadyResolved` if the capsule was already consumed
    ///   through a shared handle
    /// - `Error::InvalidOperation` if the capsule comes from another database
    pub fn resolve<T: ThreadConfined>(&self, capsule: Capsule<T>) -> Result<Option<T>> {
        self.resolve_inner(&capsule.inner)
    }

    /// Resolve through a shared handle. Only the first attempt succeeds.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::resolve`]; every attempt after the first fails
    /// with `Error::AlreadyResolved`.
    pub fn resolve_shared<T: ThreadConfined>(
        &self,
        capsule: &SharedCapsule<T>,
    ) -> Result<Option<T>> {
        self.resolve_inner(&capsule.inner)
    }

    fn resolve_inner<T: ThreadConfined>(&self, capsule: &Arc<CapsuleInner>) -> Result<Option<T>> {
        if capsule.database != self.database().id() {
            return Err(Error::InvalidOperation(format!(
                "capsule from database {} resolved on database {}",
                capsule.database,
                self.database().id()
            )));
        }
        capsule.claim()?;

        let outcome = self.locate::<T>(capsule);
        let state = match &outcome {
            Ok(Some(_)) => CapsuleState::Resolved,
            _ => CapsuleState::Absent,
        };
        capsule.finish(state);

        debug!(
            target: "vessel::capsule",
            kind = %capsule.kind,
            source_version = %capsule.source_version,
            target_version = %self.version(),
            connection = %self.id(),
            state = ?state,
            "Resolved capsule"
        );
        outcome
    }

    fn locate<T: ThreadConfined>(&self, capsule: &CapsuleInner) -> Result<Option<T>> {
        if self.is_closed() {
            return Ok(None);
        }

        if self.database().config().auto_refresh {
            self.refresh()?;
        }
        if self.version() < capsule.source_version {
            if self.is_pinned() {
                warn!(
                    target: "vessel::capsule",
                    kind = %capsule.kind,
                    source_version = %capsule.source_version,
                    target_version = %self.version(),
                    connection = %self.id(),
                    "Target is pinned behind the source version; resolving at target version"
                );
            } else {
                self.refresh()?;
            }
        }

        let bridge = self.database().bridges().get(capsule.kind)?;
        match bridge.from_payload(self, &capsule.payload)? {
            Some(entity) => entity.downcast::<T>().map(|e| Some(*e)).map_err(|_| {
                Error::InvalidOperation(format!(
                    "bridge for {} produced a different entity type",
                    capsule.kind
                ))
            }),
            None => Ok(None),
        }
    }
}
