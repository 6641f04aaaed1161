//! The diff between two snapshots of one collection.

use crate::snapshot::{EntryKey, Snapshot};
use serde::{Deserialize, Serialize};

/// An entry that changed position between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Move {
    /// Position in the old snapshot.
    pub from: usize,
    /// Position in the new snapshot.
    pub to: usize,
}

impl Move {
    /// Creates a move.
    pub const fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }
}

/// Changes between two consecutive snapshots of a collection.
///
/// Deleted and modified indices refer to the old snapshot; inserted and
/// new-modified indices refer to the new one. `modified[i]` and
/// `new_modified[i]` always describe the same entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Positions of new entries, in the new snapshot, ascending.
    pub inserted: Vec<usize>,
    /// Positions of removed entries, in the old snapshot, ascending.
    pub deleted: Vec<usize>,
    /// Positions of modified entries, in the old snapshot.
    pub modified: Vec<usize>,
    /// Positions of the same modified entries, in the new snapshot.
    pub new_modified: Vec<usize>,
    /// Entries whose relative order changed.
    pub moves: Vec<Move>,
    /// The collection was emptied and nothing was added back.
    pub is_cleared: bool,
    /// Insertions and deletions are interleaved in a way that is not one
    /// contiguous run of each; observers should re-read everything.
    pub is_reset: bool,
}

impl ChangeSet {
    /// Returns true if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
            && self.deleted.is_empty()
            && self.modified.is_empty()
            && self.moves.is_empty()
            && !self.is_cleared
            && !self.is_reset
    }

    /// Returns true if entries were added, removed or moved.
    pub fn is_structural(&self) -> bool {
        !self.inserted.is_empty()
            || !self.deleted.is_empty()
            || !self.moves.is_empty()
            || self.is_cleared
            || self.is_reset
    }

    /// Iterates over `(old, new)` positions of modified entries.
    pub fn modified_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.modified
            .iter()
            .copied()
            .zip(self.new_modified.iter().copied())
    }

    /// Expresses the change in terms of dictionary keys.
    ///
    /// Entries whose key is not a dictionary key are skipped.
    pub fn dictionary_keys(&self, old: &Snapshot, new: &Snapshot) -> DictionaryChanges {
        fn key_at(snapshot: &Snapshot, position: usize) -> Option<String> {
            match snapshot.get(position).map(|e| &e.key) {
                Some(EntryKey::Key(key)) => Some(key.clone()),
                _ => None,
            }
        }

        DictionaryChanges {
            inserted: self.inserted.iter().filter_map(|&i| key_at(new, i)).collect(),
            deleted: self.deleted.iter().filter_map(|&i| key_at(old, i)).collect(),
            modified: self
                .new_modified
                .iter()
                .filter_map(|&i| key_at(new, i))
                .collect(),
        }
    }
}

/// A [`ChangeSet`] over a dictionary, expressed as keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryChanges {
    /// Keys that were added.
    pub inserted: Vec<String>,
    /// Keys that were removed.
    pub deleted: Vec<String>,
    /// Keys whose value changed.
    pub modified: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Value, ValueKind};
    use crate::schema::ElementType;
    use crate::snapshot::{CollectionDescriptor, CollectionKind, Entry};
    use crate::types::{LineageId, Version};

    fn dict(version: u64, keys: &[&str]) -> Snapshot {
        Snapshot::new(
            CollectionDescriptor {
                lineage: LineageId::new(1),
                kind: CollectionKind::Dictionary,
                element: ElementType::Primitive(ValueKind::Int),
            },
            Version::new(version),
            keys.iter()
                .map(|k| Entry::new(EntryKey::Key((*k).to_string()), Value::Int(0)))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn empty_changeset() {
        let changes = ChangeSet::default();
        assert!(changes.is_empty());
        assert!(!changes.is_structural());
    }

    #[test]
    fn modification_is_not_structural() {
        let changes = ChangeSet {
            modified: vec![1],
            new_modified: vec![2],
            ..ChangeSet::default()
        };
        assert!(!changes.is_empty());
        assert!(!changes.is_structural());
        assert_eq!(changes.modified_pairs().collect::<Vec<_>>(), vec![(1, 2)]);
    }

    #[test]
    fn dictionary_key_view() {
        let old = dict(1, &["a", "b", "c"]);
        let new = dict(2, &["a", "c", "d"]);
        let changes = ChangeSet {
            inserted: vec![2],
            deleted: vec![1],
            modified: vec![0],
            new_modified: vec![0],
            ..ChangeSet::default()
        };
        let keys = changes.dictionary_keys(&old, &new);
        assert_eq!(keys.inserted, vec!["d"]);
        assert_eq!(keys.deleted, vec!["b"]);
        assert_eq!(keys.modified, vec!["a"]);
    }
}
