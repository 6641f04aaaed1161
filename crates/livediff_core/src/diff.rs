//! The diff engine: compares two snapshots of one lineage.
//!
//! Entries are matched by [`EntryKey`](crate::snapshot::EntryKey). Keys
//! only in the old snapshot are deletions, keys only in the new snapshot
//! are insertions. Surviving keys are modifications when their dirty paths
//! pass the subscriber's key path filter, and moves when their relative
//! order changed.
//!
//! Moves are the complement of a longest increasing subsequence of the
//! surviving entries' old positions, taken in new order. Entries on that
//! subsequence kept their relative order, so a pure append or removal
//! shifts indices without producing moves, and the reported set is as small
//! as possible. When several subsequences are equally long the one keeping
//! later entries in place wins, which reports the entry with the smaller
//! origin as the one that moved.

use crate::changeset::{ChangeSet, Move};
use crate::dirty::{DirtySet, PropertyPath};
use crate::error::{CoreError, CoreResult};
use crate::keypath::KeyPathFilter;
use crate::snapshot::Snapshot;

/// Computes [`ChangeSet`]s between snapshots.
#[derive(Debug, Clone, Copy)]
pub struct DiffEngine {
    flag_scattered_resets: bool,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self {
            flag_scattered_resets: true,
        }
    }
}

impl DiffEngine {
    /// Creates a diff engine with default behavior.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether interleaved insertions and deletions mark the change
    /// set as a reset.
    #[must_use]
    pub const fn flag_scattered_resets(mut self, value: bool) -> Self {
        self.flag_scattered_resets = value;
        self
    }

    /// Diffs `old` against `new`.
    ///
    /// Returns `Ok(None)` when there is no old snapshot: that is the initial
    /// delivery, which carries no indices.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] if the snapshots belong to
    /// different lineages.
    pub fn diff(
        &self,
        old: Option<&Snapshot>,
        new: &Snapshot,
        filter: &KeyPathFilter,
        dirty: &DirtySet,
    ) -> CoreResult<Option<ChangeSet>> {
        let Some(old) = old else {
            return Ok(None);
        };
        if old.lineage() != new.lineage() {
            return Err(CoreError::invalid_operation(format!(
                "cannot diff snapshots of different lineages ({} and {})",
                old.lineage(),
                new.lineage()
            )));
        }

        let deleted: Vec<usize> = old
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| !new.contains(&e.key))
            .map(|(pos, _)| pos)
            .collect();

        // (old position, new position) for surviving entries, in new order.
        let mut inserted = Vec::new();
        let mut survivors = Vec::with_capacity(new.len());
        for (new_pos, entry) in new.entries().iter().enumerate() {
            match old.position(&entry.key) {
                Some(old_pos) => survivors.push((old_pos, new_pos)),
                None => inserted.push(new_pos),
            }
        }

        let moves = detect_moves(&survivors);

        let mut by_old = survivors.clone();
        by_old.sort_unstable();
        let mut modified = Vec::new();
        let mut new_modified = Vec::new();
        if !filter.is_shallow() {
            let root = PropertyPath::root();
            for (old_pos, new_pos) in by_old {
                let before = &old.entries()[old_pos];
                let after = &new.entries()[new_pos];
                let changed = dirty
                    .get(&after.key)
                    .is_some_and(|paths| filter.matches_any(paths))
                    || (before.fingerprint != after.fingerprint && filter.matches(&root));
                if changed {
                    modified.push(old_pos);
                    new_modified.push(new_pos);
                }
            }
        }

        let is_cleared = new.is_empty() && !old.is_empty() && inserted.is_empty();
        let is_reset = self.flag_scattered_resets
            && !inserted.is_empty()
            && !deleted.is_empty()
            && !(is_contiguous(&inserted) && is_contiguous(&deleted));

        let changes = ChangeSet {
            inserted,
            deleted,
            modified,
            new_modified,
            moves,
            is_cleared,
            is_reset,
        };

        tracing::trace!(
            lineage = %new.lineage(),
            from = %old.version(),
            to = %new.version(),
            inserted = changes.inserted.len(),
            deleted = changes.deleted.len(),
            modified = changes.modified.len(),
            moves = changes.moves.len(),
            "computed change set"
        );

        Ok(Some(changes))
    }
}

/// Returns true if the ascending indices form one run without gaps.
pub(crate) fn is_contiguous(indices: &[usize]) -> bool {
    indices.windows(2).all(|w| w[1] == w[0] + 1)
}

fn detect_moves(survivors: &[(usize, usize)]) -> Vec<Move> {
    let old_positions: Vec<usize> = survivors.iter().map(|&(old, _)| old).collect();
    let stable = stable_entries(&old_positions);
    let mut moves: Vec<Move> = survivors
        .iter()
        .zip(stable)
        .filter(|(_, stays)| !stays)
        .map(|(&(from, to), _)| Move::new(from, to))
        .collect();
    moves.sort_unstable();
    moves
}

/// Marks the members of a longest increasing subsequence of `seq`.
///
/// Runs patience sorting over the reversed sequence looking for the longest
/// decreasing run, so that ties keep the larger values in place.
fn stable_entries(seq: &[usize]) -> Vec<bool> {
    let n = seq.len();
    let reversed: Vec<usize> = seq.iter().rev().copied().collect();
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; n];

    for (i, &value) in reversed.iter().enumerate() {
        // Longest strictly decreasing over `reversed`.
        let pos = tails.partition_point(|&t| reversed[t] > value);
        if pos > 0 {
            prev[i] = Some(tails[pos - 1]);
        }
        if pos == tails.len() {
            tails.push(i);
        } else {
            tails[pos] = i;
        }
    }

    let mut stable = vec![false; n];
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        stable[n - 1 - i] = true;
        cursor = prev[i];
    }
    stable
}
