//! Opaque identity payload
//!
//! A payload is the part of a capsule that re-locates the same logical
//! entity in another connection, at another version. It is produced by a
//! bridge from whatever identity the entity kind needs (a record key, a
//! query definition, ...) and is meaningless to everyone else.
//!
//! Payloads are MessagePack-encoded, so they own their bytes and carry no
//! reference into the producing connection or snapshot.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// Opaque, self-contained identity token
#[derive(Clone, PartialEq, Eq)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Encode an identity value
    pub fn encode<T: Serialize>(identity: &T) -> Result<Self> {
        Ok(Payload(rmp_serde::to_vec(identity)?))
    }

    /// Decode back into the identity type it was encoded from
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(rmp_serde::from_slice(&self.0)?)
    }

    /// Raw encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encoded size in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Payload bytes are opaque; only the size is useful in logs.
impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload({} bytes)", self.0.len())
    }
}
