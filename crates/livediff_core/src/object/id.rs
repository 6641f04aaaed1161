//! Object identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Persistent identity of a database object.
///
/// Object IDs are 128-bit UUIDs that are:
/// - Unique within a database
/// - Stable across versions, so they can key snapshot entries
/// - Never reused after the object is deleted
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(Uuid);

impl ObjectId {
    /// Creates a new random object ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an object ID from raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Creates a deterministic object ID from a small integer.
    ///
    /// Handy for fixtures and golden output where random IDs get in the way.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Converts to a UUID.
    #[must_use]
    pub fn to_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ObjectId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<ObjectId> for Uuid {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_unique() {
        assert_ne!(ObjectId::new(), ObjectId::new());
    }

    #[test]
    fn from_u128_is_deterministic() {
        assert_eq!(ObjectId::from_u128(7), ObjectId::from_u128(7));
        assert!(ObjectId::from_u128(1) < ObjectId::from_u128(2));
    }

    #[test]
    fn uuid_conversion() {
        let uuid = Uuid::new_v4();
        let id = ObjectId::from(uuid);
        assert_eq!(id.to_uuid(), uuid);
        assert_eq!(*id.as_bytes(), *uuid.as_bytes());
    }
}
