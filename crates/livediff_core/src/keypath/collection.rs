//! Sets of key paths plus the notification depth mode.

use super::KeyPath;
use crate::error::CoreResult;
use serde::{Deserialize, Serialize};

/// How deep a subscription looks for modifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPathsMode {
    /// Only top-level insertions, deletions and moves; never modifications.
    Shallow,
    /// Modifications at any depth up to the default traversal depth.
    Full,
    /// Modifications only along the listed paths.
    Explicit,
}

/// A set of key paths and the mode they apply in.
///
/// ```rust
/// use livediff_core::{KeyPath, KeyPathsCollection, KeyPathsMode};
///
/// let paths = KeyPathsCollection::parse_all(["FirstName", "Dog.Name"]).unwrap();
/// assert_eq!(paths.mode(), KeyPathsMode::Explicit);
///
/// let none = KeyPathsCollection::of(Vec::<KeyPath>::new());
/// assert_eq!(none.mode(), KeyPathsMode::Shallow);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyPathsCollection {
    mode: KeyPathsMode,
    paths: Vec<KeyPath>,
}

impl KeyPathsCollection {
    /// Report only structural changes.
    pub fn shallow() -> Self {
        Self {
            mode: KeyPathsMode::Shallow,
            paths: Vec::new(),
        }
    }

    /// Report modifications at every reachable depth.
    pub fn full() -> Self {
        Self {
            mode: KeyPathsMode::Full,
            paths: Vec::new(),
        }
    }

    /// Report modifications along the given paths.
    ///
    /// Duplicate paths collapse to one. An empty set is shallow.
    pub fn of(paths: impl IntoIterator<Item = KeyPath>) -> Self {
        let mut unique: Vec<KeyPath> = Vec::new();
        for path in paths {
            if !unique.contains(&path) {
                unique.push(path);
            }
        }
        if unique.is_empty() {
            Self::shallow()
        } else {
            Self {
                mode: KeyPathsMode::Explicit,
                paths: unique,
            }
        }
    }

    /// Parses each string and collects the paths.
    ///
    /// # Errors
    ///
    /// Returns the first parse error.
    pub fn parse_all<I, S>(paths: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = paths
            .into_iter()
            .map(|p| KeyPath::parse(p.as_ref()))
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self::of(parsed))
    }

    /// Returns the mode.
    pub fn mode(&self) -> KeyPathsMode {
        self.mode
    }

    /// Returns the explicit paths (empty unless the mode is `Explicit`).
    pub fn paths(&self) -> &[KeyPath] {
        &self.paths
    }

    /// Returns true for shallow collections.
    pub fn is_shallow(&self) -> bool {
        self.mode == KeyPathsMode::Shallow
    }
}

impl Default for KeyPathsCollection {
    fn default() -> Self {
        Self::full()
    }
}

impl From<KeyPath> for KeyPathsCollection {
    fn from(path: KeyPath) -> Self {
        Self::of([path])
    }
}
