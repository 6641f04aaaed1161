use super::token::SharedState;
use super::{Callback, Notification};
use crate::keypath::{KeyPathFilter, KeyPathsCollection};
use crate::snapshot::Snapshot;
use crate::types::{LineageId, SubscriptionId};
use parking_lot::Mutex;
use std::sync::Arc;

/// What a subscription has been shown so far.
#[derive(Debug, Clone)]
pub(crate) enum Delivered {
    /// Waiting for the initial delivery.
    Pending,
    /// The last snapshot the subscriber saw.
    Snapshot(Arc<Snapshot>),
    /// The final invalidation signal was sent.
    Invalidated,
}

/// A registered subscriber.
pub(crate) struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) lineage: LineageId,
    pub(crate) key_paths: KeyPathsCollection,
    pub(crate) filter: KeyPathFilter,
    pub(crate) state: Arc<SharedState>,
    callback: Mutex<Callback>,
    delivered: Mutex<Delivered>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        lineage: LineageId,
        key_paths: KeyPathsCollection,
        filter: KeyPathFilter,
        callback: Callback,
    ) -> Self {
        Self {
            id,
            lineage,
            key_paths,
            filter,
            state: Arc::new(SharedState::new()),
            callback: Mutex::new(callback),
            delivered: Mutex::new(Delivered::Pending),
        }
    }

    pub(crate) fn delivered(&self) -> Delivered {
        self.delivered.lock().clone()
    }

    pub(crate) fn advance(&self, snapshot: Arc<Snapshot>) {
        *self.delivered.lock() = Delivered::Snapshot(snapshot);
    }

    /// Marks the invalidation signal as sent and returns what was shown
    /// before.
    pub(crate) fn take_for_invalidation(&self) -> Delivered {
        std::mem::replace(&mut *self.delivered.lock(), Delivered::Invalidated)
    }

    /// Invokes the callback unless the subscription stopped being active.
    ///
    /// Returns true if the callback ran.
    pub(crate) fn deliver(&self, notification: &Notification) -> bool {
        let _running = self.state.enter();
        let mut callback = self.callback.lock();
        if !self.state.is_active() {
            return false;
        }
        (*callback)(notification);
        true
    }
}
