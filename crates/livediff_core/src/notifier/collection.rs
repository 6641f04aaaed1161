//! Subscribable collection handles.

use super::manager::Notifier;
use super::token::NotificationToken;
use super::Notification;
use crate::adapter::{AdapterEvent, CollectionChangedAdapter};
use crate::error::CoreResult;
use crate::keypath::KeyPathsCollection;
use crate::snapshot::{CollectionDescriptor, Materialized};
use crate::types::LineageId;

/// A live collection that can be observed.
///
/// Obtained from [`Notifier::collection`].
#[derive(Debug, Clone)]
pub struct LiveCollection {
    notifier: Notifier,
    descriptor: CollectionDescriptor,
}

impl LiveCollection {
    pub(crate) fn new(notifier: Notifier, descriptor: CollectionDescriptor) -> Self {
        Self {
            notifier,
            descriptor,
        }
    }

    /// Returns the lineage.
    pub fn lineage(&self) -> LineageId {
        self.descriptor.lineage
    }

    /// Returns the collection's shape and element type.
    pub fn descriptor(&self) -> &CollectionDescriptor {
        &self.descriptor
    }

    /// Registers a callback for changes to this collection.
    ///
    /// `key_paths` defaults to full-depth notifications. Key paths are
    /// validated before anything is registered. Subscribing to a collection
    /// whose parent is already gone succeeds; the initial delivery is then
    /// the invalidation signal.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Argument`](crate::CoreError::Argument) for unknown
    ///   properties or traversal through scalars.
    /// - [`CoreError::InvalidOperation`](crate::CoreError::InvalidOperation)
    ///   for explicit key paths on a collection of primitives.
    pub fn subscribe<F>(
        &self,
        callback: F,
        key_paths: Option<KeyPathsCollection>,
    ) -> CoreResult<NotificationToken>
    where
        F: FnMut(&Notification) + Send + 'static,
    {
        self.notifier
            .subscribe(&self.descriptor, key_paths, Box::new(callback))
    }

    /// Registers a handler for collection-changed events.
    ///
    /// Change sets are translated by [`CollectionChangedAdapter`]; the
    /// initial delivery and modification-only changes produce no events.
    pub fn subscribe_collection_changed<F>(&self, mut handler: F) -> CoreResult<NotificationToken>
    where
        F: FnMut(&AdapterEvent) + Send + 'static,
    {
        let adapter = CollectionChangedAdapter::new();
        self.subscribe(
            move |notification| {
                for event in adapter.translate(notification) {
                    handler(&event);
                }
            },
            Some(KeyPathsCollection::shallow()),
        )
    }

    /// Reads the collection at the source's current version.
    pub fn read(&self) -> CoreResult<Materialized> {
        self.notifier.read(self.descriptor.lineage)
    }
}
