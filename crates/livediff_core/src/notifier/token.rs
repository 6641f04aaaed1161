//! Subscription handles.

use super::manager::NotifierInner;
use crate::types::{LineageId, SubscriptionId};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

/// Lifecycle state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Receiving deliveries.
    Active,
    /// Disposed by its owner.
    Disposed,
    /// The collection's parent went away; the final delivery was made.
    Invalidated,
}

impl SubscriptionState {
    const fn to_u8(self) -> u8 {
        match self {
            SubscriptionState::Active => 0,
            SubscriptionState::Disposed => 1,
            SubscriptionState::Invalidated => 2,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => SubscriptionState::Active,
            1 => SubscriptionState::Disposed,
            _ => SubscriptionState::Invalidated,
        }
    }
}

/// State shared between a token and the notifier's subscription record.
#[derive(Debug)]
pub(crate) struct SharedState {
    state: AtomicU8,
    /// Held while the callback runs. Reentrant so the callback may dispose
    /// its own token.
    running: ReentrantMutex<()>,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(SubscriptionState::Active.to_u8()),
            running: ReentrantMutex::new(()),
        }
    }

    pub(crate) fn get(&self) -> SubscriptionState {
        SubscriptionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Blocks while the callback runs on another thread.
    pub(crate) fn enter(&self) -> ReentrantMutexGuard<'_, ()> {
        self.running.lock()
    }

    pub(crate) fn is_active(&self) -> bool {
        self.get() == SubscriptionState::Active
    }

    /// Moves from `Active` to `to`. Returns false if already terminal.
    pub(crate) fn finish(&self, to: SubscriptionState) -> bool {
        self.state
            .compare_exchange(
                SubscriptionState::Active.to_u8(),
                to.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

/// Handle returned by `subscribe`.
///
/// Disposing the token (or dropping it) stops deliveries. Disposal is
/// idempotent and may happen on any thread. From another thread it waits
/// for a callback already running; from inside the subscription's own
/// callback it returns at once. Either way no callback starts after it
/// returns.
#[must_use = "dropping the token cancels the subscription"]
pub struct NotificationToken {
    id: SubscriptionId,
    lineage: LineageId,
    state: Arc<SharedState>,
    notifier: Weak<NotifierInner>,
}

impl NotificationToken {
    pub(crate) fn new(
        id: SubscriptionId,
        lineage: LineageId,
        state: Arc<SharedState>,
        notifier: Weak<NotifierInner>,
    ) -> Self {
        Self {
            id,
            lineage,
            state,
            notifier,
        }
    }

    /// Returns the subscription id.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the subscribed lineage.
    pub fn lineage(&self) -> LineageId {
        self.lineage
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> SubscriptionState {
        self.state.get()
    }

    /// Returns true while deliveries continue.
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Stops deliveries.
    pub fn dispose(&self) {
        if self.state.finish(SubscriptionState::Disposed) {
            tracing::debug!(subscription = %self.id, lineage = %self.lineage, "subscription disposed");
        }
        drop(self.state.enter());
        if let Some(notifier) = self.notifier.upgrade() {
            notifier.remove(self.id);
        }
    }
}

impl Drop for NotificationToken {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for NotificationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationToken")
            .field("id", &self.id)
            .field("lineage", &self.lineage)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_transitions_once() {
        let state = SharedState::new();
        assert!(state.is_active());
        assert!(state.finish(SubscriptionState::Invalidated));
        assert!(!state.finish(SubscriptionState::Disposed));
        assert_eq!(state.get(), SubscriptionState::Invalidated);
    }

    #[test]
    fn dispose_without_notifier_is_idempotent() {
        let token = NotificationToken::new(
            SubscriptionId(1),
            LineageId::new(1),
            Arc::new(SharedState::new()),
            Weak::new(),
        );
        token.dispose();
        token.dispose();
        assert_eq!(token.state(), SubscriptionState::Disposed);
    }

    #[test]
    fn dispose_inside_a_running_callback_does_not_block() {
        let state = Arc::new(SharedState::new());
        let token = NotificationToken::new(
            SubscriptionId(1),
            LineageId::new(1),
            Arc::clone(&state),
            Weak::new(),
        );
        let _running = state.enter();
        token.dispose();
        assert_eq!(token.state(), SubscriptionState::Disposed);
    }
}
