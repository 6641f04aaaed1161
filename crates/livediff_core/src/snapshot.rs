//! Immutable, ordered views of a collection at one version.

use crate::error::{CoreError, CoreResult};
use crate::object::{Fingerprint, ObjectId, Value};
use crate::schema::ElementType;
use crate::types::{LineageId, Version};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Stable identity of one collection entry across snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKey {
    /// An object, for collections that hold each object at most once or
    /// whose source tracks no slots. `occurrence` counts earlier
    /// appearances of the same object, so a list holding one object twice
    /// still has unique keys.
    Object {
        /// Object identity.
        id: ObjectId,
        /// Zero for the first appearance.
        occurrence: u32,
    },
    /// Internal row id of a list or set slot. Survives moves and edits
    /// elsewhere in the collection.
    Row(u64),
    /// Dictionary key.
    Key(String),
    /// Position, for sources that track no identity at all.
    Position(u64),
}

impl EntryKey {
    /// Key for the first appearance of an object.
    pub fn object(id: ObjectId) -> Self {
        EntryKey::Object { id, occurrence: 0 }
    }

    /// Returns the object id for object keys.
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            EntryKey::Object { id, .. } => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKey::Object { id, occurrence: 0 } => write!(f, "{id}"),
            EntryKey::Object { id, occurrence } => write!(f, "{id}#{occurrence}"),
            EntryKey::Row(row) => write!(f, "row:{row}"),
            EntryKey::Key(key) => write!(f, "{key:?}"),
            EntryKey::Position(pos) => write!(f, "@{pos}"),
        }
    }
}

/// One element of a collection at a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Stable identity.
    pub key: EntryKey,
    /// The element (or dictionary value).
    pub value: Value,
    /// Hash of the properties the entry depends on.
    #[serde(default)]
    pub fingerprint: Fingerprint,
}

impl Entry {
    /// Creates an entry fingerprinted by its value alone.
    pub fn new(key: EntryKey, value: Value) -> Self {
        let fingerprint = Fingerprint::of(&value);
        Self {
            key,
            value,
            fingerprint,
        }
    }

    /// Creates an entry with an explicit fingerprint.
    pub fn with_fingerprint(key: EntryKey, value: Value, fingerprint: Fingerprint) -> Self {
        Self {
            key,
            value,
            fingerprint,
        }
    }
}

/// Shape of the underlying collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    /// Ordered list; entry order is insertion order.
    List,
    /// Set; order is stable within a version.
    Set,
    /// Dictionary; entries are keyed by the dictionary key.
    Dictionary,
    /// Live query results; order follows the declared sort.
    Results,
}

/// What the notifier needs to know about a lineage before subscribing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    /// The lineage.
    pub lineage: LineageId,
    /// Collection shape.
    pub kind: CollectionKind,
    /// Element type.
    pub element: ElementType,
}

/// An immutable, ordered view of a collection at one version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotRepr")]
pub struct Snapshot {
    lineage: LineageId,
    version: Version,
    kind: CollectionKind,
    element: ElementType,
    entries: Vec<Entry>,
    #[serde(skip)]
    index: HashMap<EntryKey, usize>,
}

#[derive(Deserialize)]
struct SnapshotRepr {
    lineage: LineageId,
    version: Version,
    kind: CollectionKind,
    element: ElementType,
    entries: Vec<Entry>,
}

impl TryFrom<SnapshotRepr> for Snapshot {
    type Error = CoreError;

    fn try_from(repr: SnapshotRepr) -> Result<Self, Self::Error> {
        Snapshot::new(
            CollectionDescriptor {
                lineage: repr.lineage,
                kind: repr.kind,
                element: repr.element,
            },
            repr.version,
            repr.entries,
        )
    }
}

impl Snapshot {
    /// Builds a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] if two entries share a key.
    pub fn new(
        descriptor: CollectionDescriptor,
        version: Version,
        entries: Vec<Entry>,
    ) -> CoreResult<Self> {
        let mut index = HashMap::with_capacity(entries.len());
        for (pos, entry) in entries.iter().enumerate() {
            if index.insert(entry.key.clone(), pos).is_some() {
                return Err(CoreError::invalid_operation(format!(
                    "duplicate entry key {} in snapshot of {}",
                    entry.key, descriptor.lineage
                )));
            }
        }
        Ok(Self {
            lineage: descriptor.lineage,
            version,
            kind: descriptor.kind,
            element: descriptor.element,
            entries,
            index,
        })
    }

    /// Builds an empty snapshot.
    pub fn empty(descriptor: CollectionDescriptor, version: Version) -> Self {
        Self {
            lineage: descriptor.lineage,
            version,
            kind: descriptor.kind,
            element: descriptor.element,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Returns the lineage.
    pub fn lineage(&self) -> LineageId {
        self.lineage
    }

    /// Returns the version the snapshot was read at.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns the collection shape.
    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// Returns the element type.
    pub fn element(&self) -> &ElementType {
        &self.element
    }

    /// Returns the entries in order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Returns the entry at a position.
    pub fn get(&self, position: usize) -> Option<&Entry> {
        self.entries.get(position)
    }

    /// Returns the position of a key.
    pub fn position(&self, key: &EntryKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Returns true if the key is present.
    pub fn contains(&self, key: &EntryKey) -> bool {
        self.index.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entry keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &EntryKey> {
        self.entries.iter().map(|e| &e.key)
    }

    /// Returns the descriptor this snapshot was built from.
    pub fn descriptor(&self) -> CollectionDescriptor {
        CollectionDescriptor {
            lineage: self.lineage,
            kind: self.kind,
            element: self.element.clone(),
        }
    }
}

/// Result of materializing a lineage at a version.
#[derive(Debug, Clone, PartialEq)]
pub enum Materialized {
    /// The collection exists.
    Live(Snapshot),
    /// The parent object or container is gone.
    Invalidated,
}

impl Materialized {
    /// Returns the snapshot if the lineage is live.
    pub fn into_live(self) -> Option<Snapshot> {
        match self {
            Materialized::Live(snapshot) => Some(snapshot),
            Materialized::Invalidated => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ValueKind;

    fn descriptor() -> CollectionDescriptor {
        CollectionDescriptor {
            lineage: LineageId::new(1),
            kind: CollectionKind::List,
            element: ElementType::Primitive(ValueKind::Int),
        }
    }

    #[test]
    fn positions_follow_order() {
        let snap = Snapshot::new(
            descriptor(),
            Version::new(3),
            vec![
                Entry::new(EntryKey::Row(10), Value::Int(1)),
                Entry::new(EntryKey::Row(11), Value::Int(2)),
            ],
        )
        .unwrap();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.position(&EntryKey::Row(11)), Some(1));
        assert_eq!(snap.position(&EntryKey::Row(12)), None);
        assert_eq!(snap.version(), Version::new(3));
    }

    #[test]
    fn duplicate_keys_rejected() {
        let err = Snapshot::new(
            descriptor(),
            Version::new(1),
            vec![
                Entry::new(EntryKey::Row(1), Value::Int(1)),
                Entry::new(EntryKey::Row(1), Value::Int(2)),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidOperation { .. }));
    }

    #[test]
    fn occurrences_keep_keys_unique() {
        let id = ObjectId::from_u128(1);
        let snap = Snapshot::new(
            CollectionDescriptor {
                element: ElementType::object("Person"),
                ..descriptor()
            },
            Version::new(1),
            vec![
                Entry::new(EntryKey::object(id), Value::Object(id)),
                Entry::new(
                    EntryKey::Object { id, occurrence: 1 },
                    Value::Object(id),
                ),
            ],
        )
        .unwrap();
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn json_roundtrip_rebuilds_index() {
        let snap = Snapshot::new(
            descriptor(),
            Version::new(1),
            vec![Entry::new(EntryKey::Key("a".into()), Value::Int(1))],
        )
        .unwrap();
        let json = serde_json::to_string(&snap).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.position(&EntryKey::Key("a".into())), Some(0));
    }
}
