//! Dirty-property feed consumed by the diff engine.

use crate::snapshot::EntryKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Chain of persisted property names from an entry to a changed property.
///
/// `["Dog", "Name"]` means the entry's `Dog` link target had its `Name`
/// changed. The empty path means the entry's value itself was replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyPath(Vec<String>);

impl PropertyPath {
    /// The empty path: the entry itself changed.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Creates a path from storage names.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Parses a dotted path without validation.
    pub fn dotted(path: &str) -> Self {
        if path.is_empty() {
            Self::root()
        } else {
            Self::new(path.split('.'))
        }
    }

    /// Returns the segments.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns true for the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true for the root path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new path with `segment` appended.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<self>")
        } else {
            write!(f, "{}", self.0.join("."))
        }
    }
}

/// Changed property paths per entry, accumulated over a range of commits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtySet {
    entries: HashMap<EntryKey, BTreeSet<PropertyPath>>,
}

impl DirtySet {
    /// Creates an empty dirty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a changed path for an entry.
    pub fn insert(&mut self, key: EntryKey, path: PropertyPath) {
        self.entries.entry(key).or_default().insert(path);
    }

    /// Builder-style [`DirtySet::insert`].
    #[must_use]
    pub fn with(mut self, key: EntryKey, path: PropertyPath) -> Self {
        self.insert(key, path);
        self
    }

    /// Returns the changed paths for an entry.
    pub fn get(&self, key: &EntryKey) -> Option<&BTreeSet<PropertyPath>> {
        self.entries.get(key).filter(|paths| !paths.is_empty())
    }

    /// Returns true if the entry has recorded changes.
    pub fn contains(&self, key: &EntryKey) -> bool {
        self.get(key).is_some()
    }

    /// Merges another dirty set into this one.
    pub fn merge(&mut self, other: DirtySet) {
        for (key, paths) in other.entries {
            self.entries.entry(key).or_default().extend(paths);
        }
    }

    /// Number of dirty entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is dirty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over dirty entries.
    pub fn iter(&self) -> impl Iterator<Item = (&EntryKey, &BTreeSet<PropertyPath>)> {
        self.entries.iter()
    }
}

impl FromIterator<(EntryKey, PropertyPath)> for DirtySet {
    fn from_iter<T: IntoIterator<Item = (EntryKey, PropertyPath)>>(iter: T) -> Self {
        let mut set = DirtySet::new();
        for (key, path) in iter {
            set.insert(key, path);
        }
        set
    }
}
