//! # LiveDiff Core
//!
//! Change notifications for live collections of an embedded object
//! database.
//!
//! This crate provides:
//! - Key paths and key path filters resolved against an explicit schema
//! - Immutable collection snapshots
//! - A diff engine producing insert/delete/modify/move change sets
//! - A notifier delivering change sets to subscribers on each refresh
//! - A collection-changed adapter for coarse UI-style events
//! - An in-memory reference data source
//!
//! ## Architecture
//!
//! A write transaction commits on the data source, which signals the
//! notifier. On the next refresh the notifier reads every subscribed
//! collection once, diffs it against what each subscriber saw last and
//! calls back with the change set:
//!
//! ```text
//! commit -> SnapshotSource -> Notifier::refresh -> DiffEngine -> callback
//!                                                             -> adapter
//! ```
//!
//! ## Key Invariants
//!
//! - Every subscription receives exactly one initial delivery first
//! - Deleted and modified indices refer to the old snapshot, inserted and
//!   new-modified indices to the new one
//! - Key paths are validated when subscribing, never during delivery
//! - No callback runs after its token is disposed

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod changeset;
mod config;
pub mod diff;
pub mod dirty;
mod error;
pub mod keypath;
pub mod memory;
pub mod notifier;
pub mod object;
pub mod schema;
pub mod snapshot;
mod source;
mod types;

pub use adapter::{
    AdapterEvent, CollectionAction, CollectionChangedAdapter, CollectionChangedEvent,
};
pub use changeset::{ChangeSet, DictionaryChanges, Move};
pub use config::{InitialDelivery, NotifierConfig};
pub use diff::DiffEngine;
pub use dirty::{DirtySet, PropertyPath};
pub use error::{CoreError, CoreResult};
pub use keypath::{KeyPath, KeyPathFilter, KeyPathsCollection, KeyPathsMode, PropertyExpr};
pub use memory::{MemorySource, MemorySourceConfig, ResultsQuery, WriteTransaction};
pub use notifier::{
    CollectionState, LiveCollection, Notification, NotificationToken, Notifier, NotifierStats,
    StatsSnapshot, SubscriptionState,
};
pub use object::{Fingerprint, ObjectId, Value, ValueKind};
pub use schema::{ElementType, ObjectSchema, Property, PropertyKind, Schema};
pub use snapshot::{CollectionDescriptor, CollectionKind, Entry, EntryKey, Materialized, Snapshot};
pub use source::{CommitHook, SnapshotSource};
pub use types::{LineageId, SubscriptionId, Version};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
