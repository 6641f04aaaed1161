//! Callbacks that record what they receive.

use livediff_core::{AdapterEvent, ChangeSet, CollectionChangedEvent, Notification};
use parking_lot::Mutex;
use std::sync::Arc;

/// Collects every notification delivered to its callbacks.
///
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<Notification>>>,
}

impl Recorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a callback appending to this recorder.
    pub fn callback(&self) -> impl FnMut(&Notification) + Send + 'static {
        let log = Arc::clone(&self.log);
        move |notification: &Notification| log.lock().push(notification.clone())
    }

    /// Number of notifications received.
    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    /// Returns true if nothing was received.
    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    /// All notifications, oldest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.log.lock().clone()
    }

    /// The most recent notification.
    pub fn last(&self) -> Option<Notification> {
        self.log.lock().last().cloned()
    }

    /// Change set of the most recent notification.
    pub fn last_changes(&self) -> Option<ChangeSet> {
        self.last().and_then(|n| n.changes)
    }

    /// Change sets of every non-initial notification, oldest first.
    pub fn changes(&self) -> Vec<ChangeSet> {
        self.log
            .lock()
            .iter()
            .filter_map(|n| n.changes.clone())
            .collect()
    }

    /// Forgets everything received so far.
    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

/// Collects adapter events.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    log: Arc<Mutex<Vec<AdapterEvent>>>,
}

impl EventRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handler appending to this recorder.
    pub fn handler(&self) -> impl FnMut(&AdapterEvent) + Send + 'static {
        let log = Arc::clone(&self.log);
        move |event: &AdapterEvent| log.lock().push(event.clone())
    }

    /// All events, oldest first.
    pub fn events(&self) -> Vec<AdapterEvent> {
        self.log.lock().clone()
    }

    /// Only the collection-changed events.
    pub fn collection_changed(&self) -> Vec<CollectionChangedEvent> {
        self.log
            .lock()
            .iter()
            .filter_map(|event| match event {
                AdapterEvent::CollectionChanged(e) => Some(e.clone()),
                AdapterEvent::PropertyChanged(_) => None,
            })
            .collect()
    }

    /// Names from the property-changed events.
    pub fn property_names(&self) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter_map(|event| match event {
                AdapterEvent::PropertyChanged(name) => Some(name.clone()),
                AdapterEvent::CollectionChanged(_) => None,
            })
            .collect()
    }

    /// Forgets everything received so far.
    pub fn clear(&self) {
        self.log.lock().clear();
    }
}
