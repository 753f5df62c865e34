//! Contract types shared by every layer
//!
//! - `version`: Commit version identifier
//! - `entity_kind`: Kind tag of thread-confined entities
//! - `payload`: Opaque identity token carried by capsules

pub mod entity_kind;
pub mod payload;
pub mod version;

pub use entity_kind::EntityKind;
pub use payload::Payload;
pub use version::Version;
