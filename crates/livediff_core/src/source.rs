//! The data source seam.
//!
//! The notifier never reads storage directly. Everything it knows about a
//! collection comes through [`SnapshotSource`]: the version to read, the
//! snapshot at that version, which properties of which entries were
//! written in between, and a signal when a write transaction commits.

use crate::dirty::DirtySet;
use crate::error::CoreResult;
use crate::schema::Schema;
use crate::snapshot::{CollectionDescriptor, Materialized};
use crate::types::{LineageId, Version};
use std::sync::Arc;

/// Callback invoked after each commit with the committed version.
///
/// May be called from any thread.
pub type CommitHook = Arc<dyn Fn(Version) + Send + Sync>;

/// A provider of consistent collection snapshots.
pub trait SnapshotSource: Send + Sync {
    /// Returns the schema used to resolve key paths.
    fn schema(&self) -> Arc<Schema>;

    /// Describes a lineage: its shape and element type.
    ///
    /// Must keep answering for lineages whose parent was deleted.
    fn descriptor(&self, lineage: LineageId) -> CoreResult<CollectionDescriptor>;

    /// Returns the latest committed version visible to `lineage`.
    fn current_version(&self, lineage: LineageId) -> CoreResult<Version>;

    /// Reads a lineage at a version.
    ///
    /// A lineage whose parent object or container is gone materializes as
    /// [`Materialized::Invalidated`]; that is not an error.
    fn materialize(&self, lineage: LineageId, version: Version) -> CoreResult<Materialized>;

    /// Returns the property paths written on entries of `lineage` by the
    /// commits in `(since, until]`, merged.
    fn dirty_properties(
        &self,
        lineage: LineageId,
        since: Version,
        until: Version,
    ) -> CoreResult<DirtySet>;

    /// Registers a hook called after every commit.
    fn on_commit(&self, hook: CommitHook);

    /// Longest path [`dirty_properties`](Self::dirty_properties) reports,
    /// or `None` if paths are unbounded.
    ///
    /// Explicit key paths longer than this are rejected at subscribe time.
    fn max_dirty_path_len(&self) -> Option<usize> {
        None
    }
}
