//! Bridging between live entities and opaque identity payloads
//!
//! Every kind of thread-confined entity that can travel in a capsule has a
//! `Bridge`: `to_payload` extracts a connection-independent identity from a
//! live entity, and `from_payload` re-locates that identity on another
//! connection at its current version.
//!
//! Bridges are registered per `EntityKind` in a `BridgeRegistry`, so new
//! kinds can be added without the capsule layer knowing their internals.
//! The registry stores bridges type-erased; the capsule's type parameter
//! restores the concrete entity type on resolve.

use dashmap::DashMap;
use std::any::Any;
use std::sync::Arc;
use vessel_core::{EntityKind, Error, Key, Payload, Query, Result};

use crate::connection::Connection;
use crate::record::Record;
use crate::results::ResultSet;

/// A live value bound to one connection and the thread that owns it
pub trait ThreadConfined: Sized + 'static {
    /// Kind tag carried by capsules of this type
    const KIND: EntityKind;

    /// Owning connection, or `None` for unmanaged values
    fn connection(&self) -> Option<&Connection>;

    /// Check if the entity still refers to something that exists
    fn is_valid(&self) -> bool;
}

/// Conversion between one entity type and its identity payload
pub trait Bridge: Send + Sync + 'static {
    /// Entity type handled by this bridge
    type Entity: ThreadConfined;

    /// Extract an identity that re-locates `entity` on any connection
    fn to_payload(&self, entity: &Self::Entity) -> Result<Payload>;

    /// Re-locate the identity on `connection` at its current version
    ///
    /// Returns `Ok(None)` when the identity no longer exists there.
    fn from_payload(
        &self,
        connection: &Connection,
        payload: &Payload,
    ) -> Result<Option<Self::Entity>>;
}

/// Object-safe form of `Bridge`
pub(crate) trait ErasedBridge: Send + Sync {
    fn to_payload(&self, entity: &dyn Any) -> Result<Payload>;

    fn from_payload(
        &self,
        connection: &Connection,
        payload: &Payload,
    ) -> Result<Option<Box<dyn Any>>>;
}

impl<B: Bridge> ErasedBridge for B {
    fn to_payload(&self, entity: &dyn Any) -> Result<Payload> {
        let entity = entity.downcast_ref::<B::Entity>().ok_or_else(|| {
            Error::InvalidOperation(format!(
                "bridge for {} received a different entity type",
                B::Entity::KIND
            ))
        })?;
        Bridge::to_payload(self, entity)
    }

    fn from_payload(
        &self,
        connection: &Connection,
        payload: &Payload,
    ) -> Result<Option<Box<dyn Any>>> {
        Ok(Bridge::from_payload(self, connection, payload)?
            .map(|entity| Box::new(entity) as Box<dyn Any>))
    }
}

/// Bridges keyed by entity kind
#[derive(Default)]
pub struct BridgeRegistry {
    bridges: DashMap<EntityKind, Arc<dyn ErasedBridge>>,
}

impl BridgeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the record and result-set bridges
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(RecordBridge);
        registry.register(ResultSetBridge);
        registry
    }

    /// Register a bridge, replacing any bridge for the same kind
    ///
    /// Returns `true` if one was replaced.
    pub fn register<B: Bridge>(&self, bridge: B) -> bool {
        self.bridges
            .insert(B::Entity::KIND, Arc::new(bridge))
            .is_some()
    }

    /// Check if `kind` has a bridge
    pub fn contains(&self, kind: EntityKind) -> bool {
        self.bridges.contains_key(&kind)
    }

    /// Registered kinds, in no particular order
    pub fn kinds(&self) -> Vec<EntityKind> {
        self.bridges.iter().map(|e| *e.key()).collect()
    }

    /// Number of registered kinds
    pub fn len(&self) -> usize {
        self.bridges.len()
    }

    /// Check if no bridge is registered
    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
    }

    pub(crate) fn get(&self, kind: EntityKind) -> Result<Arc<dyn ErasedBridge>> {
        self.bridges
            .get(&kind)
            .map(|e| Arc::clone(e.value()))
            .ok_or(Error::UnsupportedKind(kind))
    }
}

impl std::fmt::Debug for BridgeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.kinds()).finish()
    }
}

/// Bridge for single records. The identity is the record's key.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordBridge;

impl Bridge for RecordBridge {
    type Entity = Record;

    fn to_payload(&self, entity: &Record) -> Result<Payload> {
        Payload::encode(entity.key())
    }

    fn from_payload(&self, connection: &Connection, payload: &Payload) -> Result<Option<Record>> {
        let key: Key = payload.decode()?;
        connection.lookup(&key)
    }
}

/// Bridge for result sets. The identity is the query definition, so the
/// resolved set is the same query evaluated at the target version.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultSetBridge;

impl Bridge for ResultSetBridge {
    type Entity = ResultSet;

    fn to_payload(&self, entity: &ResultSet) -> Result<Payload> {
        Payload::encode(entity.query())
    }

    fn from_payload(
        &self,
        connection: &Connection,
        payload: &Payload,
    ) -> Result<Option<ResultSet>> {
        let query: Query = payload.decode()?;
        connection.evaluate(query)
    }
}
