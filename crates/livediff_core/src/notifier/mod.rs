//! Subscription management and change delivery.
//!
//! A [`Notifier`] sits on top of a [`SnapshotSource`](crate::SnapshotSource).
//! Subscribers register a callback on a [`LiveCollection`] and get back a
//! [`NotificationToken`]. Each [`Notifier::refresh`] reads every subscribed
//! lineage once, diffs it against what each subscriber saw last and invokes
//! the callbacks whose change set is non-empty.
//!
//! # Delivery order
//!
//! 1. One initial delivery with `changes == None`.
//! 2. One delivery per refresh that produced a non-empty change set.
//! 3. If the lineage is invalidated, one final delivery in the
//!    [`CollectionState::Invalidated`] state, then nothing.
//!
//! # Example
//!
//! ```rust,ignore
//! let notifier = Notifier::new(source, NotifierConfig::default());
//! let people = notifier.collection(lineage)?;
//! let token = people.subscribe(|n| println!("{:?}", n.changes), None)?;
//!
//! // ... commit a write on the source ...
//! notifier.refresh();
//! token.dispose();
//! ```

mod collection;
mod manager;
mod stats;
mod subscription;
mod token;

pub use collection::LiveCollection;
pub use manager::Notifier;
pub use stats::{NotifierStats, StatsSnapshot};
pub use token::{NotificationToken, SubscriptionState};

use crate::changeset::ChangeSet;
use crate::snapshot::Snapshot;
use crate::types::{LineageId, SubscriptionId};
use std::sync::Arc;

/// Callback invoked for each delivery.
pub type Callback = Box<dyn FnMut(&Notification) + Send>;

/// State of a collection at delivery time.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionState {
    /// The collection exists; this is its current content.
    Live(Arc<Snapshot>),
    /// The parent object or container was deleted.
    Invalidated,
}

/// One delivery to a subscriber.
#[derive(Debug, Clone)]
pub struct Notification {
    /// The receiving subscription.
    pub subscription: SubscriptionId,
    /// The collection lineage.
    pub lineage: LineageId,
    /// Current state of the collection.
    pub state: CollectionState,
    /// The snapshot the change set is relative to.
    pub previous: Option<Arc<Snapshot>>,
    /// `None` for the initial delivery.
    pub changes: Option<ChangeSet>,
}

impl Notification {
    /// Returns true for the initial delivery.
    pub fn is_initial(&self) -> bool {
        self.changes.is_none()
    }

    /// Returns true if the collection was invalidated.
    pub fn is_invalidated(&self) -> bool {
        matches!(self.state, CollectionState::Invalidated)
    }

    /// Returns the current snapshot for live collections.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match &self.state {
            CollectionState::Live(snapshot) => Some(snapshot),
            CollectionState::Invalidated => None,
        }
    }

    /// Number of entries now in the collection; zero once invalidated.
    pub fn count(&self) -> usize {
        self.snapshot().map_or(0, Snapshot::len)
    }
}
