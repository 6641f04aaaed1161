//! Property-based test generators using proptest.
//!
//! Lists are modelled as rows with a stable identity and an integer value,
//! edited by random scripts of inserts, removals, moves and replacements.
//! [`verify_change_set`] checks a change set against the two snapshots it
//! was computed from by replaying it.

use livediff_core::{
    ChangeSet, CollectionDescriptor, CollectionKind, ElementType, Entry, EntryKey, LineageId,
    Snapshot, Value, ValueKind, Version,
};
use proptest::prelude::*;
use std::collections::HashSet;

/// One row of a modelled list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row {
    /// Stable identity.
    pub id: u64,
    /// Current value.
    pub value: i64,
}

/// One edit of a modelled list.
///
/// Positions are taken modulo the list length when applied, so any script
/// applies to any list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEdit {
    /// Insert a new row.
    Insert {
        /// Position, modulo `len + 1`.
        at: usize,
        /// Value of the new row.
        value: i64,
    },
    /// Remove a row.
    Remove {
        /// Position, modulo `len`.
        at: usize,
    },
    /// Move a row.
    Move {
        /// Source position, modulo `len`.
        from: usize,
        /// Destination position, modulo `len`.
        to: usize,
    },
    /// Change a row's value in place.
    Replace {
        /// Position, modulo `len`.
        at: usize,
        /// New value.
        value: i64,
    },
}

/// Strategy for generating a starting list of `0..max_len` rows with ids
/// `0..len`.
pub fn rows_strategy(max_len: usize) -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec(-100i64..100, 0..max_len).prop_map(|values| {
        values
            .into_iter()
            .enumerate()
            .map(|(id, value)| Row {
                id: id as u64,
                value,
            })
            .collect()
    })
}

/// Strategy for generating one edit.
pub fn list_edit_strategy() -> impl Strategy<Value = ListEdit> {
    prop_oneof![
        3 => (any::<usize>(), -100i64..100).prop_map(|(at, value)| ListEdit::Insert { at, value }),
        2 => any::<usize>().prop_map(|at| ListEdit::Remove { at }),
        2 => (any::<usize>(), any::<usize>()).prop_map(|(from, to)| ListEdit::Move { from, to }),
        1 => (any::<usize>(), -100i64..100).prop_map(|(at, value)| ListEdit::Replace { at, value }),
    ]
}

/// Strategy for generating an edit script.
pub fn edit_script_strategy(
    min_edits: usize,
    max_edits: usize,
) -> impl Strategy<Value = Vec<ListEdit>> {
    prop::collection::vec(list_edit_strategy(), min_edits..max_edits)
}

/// Applies `edits` to `rows`. New rows get ids above every existing id.
pub fn apply_edits(rows: &[Row], edits: &[ListEdit]) -> Vec<Row> {
    let mut out = rows.to_vec();
    let mut next_id = rows.iter().map(|r| r.id + 1).max().unwrap_or(0);
    for edit in edits {
        match *edit {
            ListEdit::Insert { at, value } => {
                out.insert(at % (out.len() + 1), Row { id: next_id, value });
                next_id += 1;
            }
            ListEdit::Remove { at } if !out.is_empty() => {
                out.remove(at % out.len());
            }
            ListEdit::Move { from, to } if !out.is_empty() => {
                let row = out.remove(from % out.len());
                out.insert(to % (out.len() + 1), row);
            }
            ListEdit::Replace { at, value } if !out.is_empty() => {
                let len = out.len();
                out[at % len].value = value;
            }
            _ => {}
        }
    }
    out
}

/// Builds a list snapshot of `rows` on lineage 1.
pub fn snapshot_of(version: u64, rows: &[Row]) -> Snapshot {
    Snapshot::new(
        CollectionDescriptor {
            lineage: LineageId::new(1),
            kind: CollectionKind::List,
            element: ElementType::Primitive(ValueKind::Int),
        },
        Version::new(version),
        rows.iter()
            .map(|row| Entry::new(EntryKey::Row(row.id), Value::Int(row.value)))
            .collect(),
    )
    .expect("Row ids are unique")
}

/// Rebuilds the key order of `new` from `old` and `changes`.
///
/// Moved entries and insertions are placed at their new positions; every
/// other surviving entry fills the remaining positions in its old order.
/// Insertions are taken from `new`, since a change set carries positions
/// only.
pub fn replay(
    old: &Snapshot,
    new: &Snapshot,
    changes: &ChangeSet,
) -> Result<Vec<EntryKey>, String> {
    let mut slots: Vec<Option<EntryKey>> = vec![None; new.len()];

    for &at in &changes.inserted {
        let key = new
            .get(at)
            .map(|e| e.key.clone())
            .ok_or_else(|| format!("inserted position {at} out of bounds"))?;
        place(&mut slots, at, key)?;
    }
    let mut moved = HashSet::new();
    for m in &changes.moves {
        let key = old
            .get(m.from)
            .map(|e| e.key.clone())
            .ok_or_else(|| format!("move source {} out of bounds", m.from))?;
        place(&mut slots, m.to, key)?;
        moved.insert(m.from);
    }

    let deleted: HashSet<usize> = changes.deleted.iter().copied().collect();
    let mut stable = old
        .entries()
        .iter()
        .enumerate()
        .filter(|(pos, _)| !deleted.contains(pos) && !moved.contains(pos))
        .map(|(_, e)| e.key.clone());
    for slot in slots.iter_mut().filter(|s| s.is_none()) {
        *slot = stable.next();
    }
    if stable.next().is_some() {
        return Err("more surviving entries than free positions".to_string());
    }
    slots
        .into_iter()
        .enumerate()
        .map(|(pos, slot)| slot.ok_or_else(|| format!("position {pos} left empty")))
        .collect()
}

fn place(slots: &mut [Option<EntryKey>], at: usize, key: EntryKey) -> Result<(), String> {
    let len = slots.len();
    let Some(slot) = slots.get_mut(at) else {
        return Err(format!("position {at} out of bounds ({len})"));
    };
    if slot.is_some() {
        return Err(format!("position {at} filled twice"));
    }
    *slot = Some(key);
    Ok(())
}

/// Checks every structural guarantee of `changes` against the snapshots.
///
/// Returns a description of the first violation.
pub fn verify_change_set(
    old: &Snapshot,
    new: &Snapshot,
    changes: &ChangeSet,
) -> Result<(), String> {
    let ascending = |name: &str, v: &[usize]| {
        if v.windows(2).all(|w| w[0] < w[1]) {
            Ok(())
        } else {
            Err(format!("{name} not strictly ascending: {v:?}"))
        }
    };
    ascending("inserted", &changes.inserted)?;
    ascending("deleted", &changes.deleted)?;
    ascending("modified", &changes.modified)?;

    for &at in &changes.deleted {
        match old.get(at) {
            Some(entry) if !new.contains(&entry.key) => {}
            _ => return Err(format!("deleted position {at} does not name a removed entry")),
        }
    }
    for &at in &changes.inserted {
        match new.get(at) {
            Some(entry) if !old.contains(&entry.key) => {}
            _ => return Err(format!("inserted position {at} does not name a new entry")),
        }
    }
    if changes.modified.len() != changes.new_modified.len() {
        return Err("modified and new_modified differ in length".to_string());
    }
    for (before, after) in changes.modified_pairs() {
        let same = old
            .get(before)
            .zip(new.get(after))
            .is_some_and(|(a, b)| a.key == b.key);
        if !same {
            return Err(format!("modification {before} -> {after} names two entries"));
        }
    }
    for m in &changes.moves {
        let same = old
            .get(m.from)
            .zip(new.get(m.to))
            .is_some_and(|(a, b)| a.key == b.key);
        if !same {
            return Err(format!("move {} -> {} names two entries", m.from, m.to));
        }
    }

    let expected: Vec<EntryKey> = new.keys().cloned().collect();
    let rebuilt = replay(old, new, changes)?;
    if rebuilt != expected {
        return Err(format!("replay gives {rebuilt:?}, expected {expected:?}"));
    }
    Ok(())
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
