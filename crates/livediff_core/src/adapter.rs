//! Translation of change sets into coarse collection-changed events.
//!
//! UI-style observers understand only a handful of actions: one contiguous
//! add, one contiguous remove, a single replace, a single move, or "reset,
//! re-read everything". [`CollectionChangedAdapter`] picks the narrowest
//! action that describes a [`ChangeSet`] and falls back to `Reset` for
//! anything else.

use crate::changeset::{ChangeSet, Move};
use crate::diff::is_contiguous;
use crate::notifier::{CollectionState, Notification};
use crate::object::Value;
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};

/// Property notification name for the element count.
pub const COUNT_PROPERTY: &str = "Count";

/// Property notification name for the indexer.
pub const INDEXER_PROPERTY: &str = "Item[]";

/// Kind of collection-changed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionAction {
    /// Items were added at `new_start`.
    Add,
    /// Items were removed from `old_start`.
    Remove,
    /// One item was replaced in place.
    Replace,
    /// Items moved from `old_start` to `new_start`.
    Move,
    /// Too much changed to describe; re-read the collection.
    Reset,
}

/// A collection-changed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionChangedEvent {
    /// What happened.
    pub action: CollectionAction,
    /// Items now in the collection, for add, replace and move.
    pub new_items: Vec<Value>,
    /// Items that left the collection, for remove and replace.
    pub old_items: Vec<Value>,
    /// Index of the first new item.
    pub new_start: Option<usize>,
    /// Index of the first old item.
    pub old_start: Option<usize>,
    /// False when the collection was invalidated and must not be read.
    pub sender_valid: bool,
}

impl CollectionChangedEvent {
    fn new(action: CollectionAction) -> Self {
        Self {
            action,
            new_items: Vec::new(),
            old_items: Vec::new(),
            new_start: None,
            old_start: None,
            sender_valid: true,
        }
    }

    /// A reset event.
    pub fn reset(sender_valid: bool) -> Self {
        Self {
            sender_valid,
            ..Self::new(CollectionAction::Reset)
        }
    }
}

/// An event produced by the adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterEvent {
    /// The collection changed.
    CollectionChanged(CollectionChangedEvent),
    /// A derived property should be re-read.
    PropertyChanged(String),
}

/// Stateless translator from notifications to collection-changed events.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionChangedAdapter;

impl CollectionChangedAdapter {
    /// Creates an adapter.
    pub fn new() -> Self {
        Self
    }

    /// Translates one delivery.
    ///
    /// Returns nothing for the initial delivery of a live collection and for
    /// modification-only change sets. Every other delivery yields one
    /// collection-changed event followed by `Count` and `Item[]` property
    /// notifications.
    pub fn translate(&self, notification: &Notification) -> Vec<AdapterEvent> {
        let event = match (&notification.state, &notification.changes) {
            (CollectionState::Invalidated, _) => Some(CollectionChangedEvent::reset(false)),
            (CollectionState::Live(_), None) => None,
            (CollectionState::Live(current), Some(changes)) => {
                self.event_for(notification.previous.as_deref(), current, changes)
            }
        };
        event.map(with_properties).unwrap_or_default()
    }

    /// Picks the event describing `changes` between `previous` and
    /// `current`. Returns `None` for change sets with no structural change.
    pub fn event_for(
        &self,
        previous: Option<&Snapshot>,
        current: &Snapshot,
        changes: &ChangeSet,
    ) -> Option<CollectionChangedEvent> {
        if !changes.is_structural() {
            return None;
        }
        if changes.is_reset || changes.is_cleared {
            return Some(CollectionChangedEvent::reset(true));
        }

        let inserted = &changes.inserted;
        let deleted = &changes.deleted;
        let moves = &changes.moves;

        let event = if moves.is_empty() && deleted.is_empty() && is_contiguous(inserted) {
            let start = inserted[0];
            CollectionChangedEvent {
                new_items: values(Some(current), inserted),
                new_start: Some(start),
                ..CollectionChangedEvent::new(CollectionAction::Add)
            }
        } else if moves.is_empty() && inserted.is_empty() && is_contiguous(deleted) {
            let start = deleted[0];
            CollectionChangedEvent {
                old_items: values(previous, deleted),
                old_start: Some(start),
                ..CollectionChangedEvent::new(CollectionAction::Remove)
            }
        } else if moves.is_empty()
            && inserted.len() == 1
            && deleted.len() == 1
            && inserted[0] == deleted[0]
        {
            CollectionChangedEvent {
                new_items: values(Some(current), inserted),
                old_items: values(previous, deleted),
                new_start: Some(inserted[0]),
                old_start: Some(deleted[0]),
                ..CollectionChangedEvent::new(CollectionAction::Replace)
            }
        } else if inserted.is_empty() && deleted.is_empty() {
            move_event(current, moves)?
        } else {
            CollectionChangedEvent::reset(true)
        };
        Some(event)
    }
}

/// Describes one move, or two adjacent moves as a single two-item move.
///
/// For the pair, the reported destination is the later move's destination
/// minus one.
fn move_event(current: &Snapshot, moves: &[Move]) -> Option<CollectionChangedEvent> {
    let (old_start, new_start, targets) = match moves {
        [only] => (only.from, only.to, vec![only.to]),
        [first, second] if second.from == first.from + 1 && second.to == first.to + 1 => {
            (first.from, second.to.saturating_sub(1), vec![first.to, second.to])
        }
        [] => return None,
        _ => return Some(CollectionChangedEvent::reset(true)),
    };
    Some(CollectionChangedEvent {
        new_items: values(Some(current), &targets),
        new_start: Some(new_start),
        old_start: Some(old_start),
        ..CollectionChangedEvent::new(CollectionAction::Move)
    })
}

fn values(snapshot: Option<&Snapshot>, positions: &[usize]) -> Vec<Value> {
    let Some(snapshot) = snapshot else {
        return Vec::new();
    };
    positions
        .iter()
        .filter_map(|&pos| snapshot.get(pos).map(|entry| entry.value.clone()))
        .collect()
}

fn with_properties(event: CollectionChangedEvent) -> Vec<AdapterEvent> {
    vec![
        AdapterEvent::CollectionChanged(event),
        AdapterEvent::PropertyChanged(COUNT_PROPERTY.to_string()),
        AdapterEvent::PropertyChanged(INDEXER_PROPERTY.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ObjectId, ValueKind};
    use crate::schema::ElementType;
    use crate::snapshot::{CollectionDescriptor, CollectionKind, Entry, EntryKey};
    use crate::types::{LineageId, SubscriptionId, Version};
    use std::sync::Arc;

    fn list(version: u64, items: &[i64]) -> Snapshot {
        Snapshot::new(
            CollectionDescriptor {
                lineage: LineageId::new(7),
                kind: CollectionKind::List,
                element: ElementType::Primitive(ValueKind::Int),
            },
            Version::new(version),
            items
                .iter()
                .map(|&n| Entry::new(EntryKey::Row(n as u64), Value::Int(n)))
                .collect(),
        )
        .unwrap()
    }

    fn event(old: &[i64], new: &[i64], changes: ChangeSet) -> Option<CollectionChangedEvent> {
        CollectionChangedAdapter::new().event_for(Some(&list(1, old)), &list(2, new), &changes)
    }

    #[test]
    fn contiguous_insert_is_add() {
        let ev = event(
            &[1, 2],
            &[1, 5, 6, 2],
            ChangeSet {
                inserted: vec![1, 2],
                ..ChangeSet::default()
            },
        )
        .unwrap();
        assert_eq!(ev.action, CollectionAction::Add);
        assert_eq!(ev.new_start, Some(1));
        assert_eq!(ev.new_items, vec![Value::Int(5), Value::Int(6)]);
    }

    #[test]
    fn scattered_insert_is_reset() {
        let ev = event(
            &[1, 2],
            &[5, 1, 2, 6],
            ChangeSet {
                inserted: vec![0, 3],
                ..ChangeSet::default()
            },
        )
        .unwrap();
        assert_eq!(ev.action, CollectionAction::Reset);
        assert!(ev.sender_valid);
    }

    #[test]
    fn contiguous_delete_is_remove() {
        let ev = event(
            &[1, 2, 3],
            &[1],
            ChangeSet {
                deleted: vec![1, 2],
                ..ChangeSet::default()
            },
        )
        .unwrap();
        assert_eq!(ev.action, CollectionAction::Remove);
        assert_eq!(ev.old_start, Some(1));
        assert_eq!(ev.old_items, vec![Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn same_index_swap_is_replace() {
        let ev = event(
            &[1, 2, 3],
            &[1, 9, 3],
            ChangeSet {
                inserted: vec![1],
                deleted: vec![1],
                ..ChangeSet::default()
            },
        )
        .unwrap();
        assert_eq!(ev.action, CollectionAction::Replace);
        assert_eq!(ev.old_items, vec![Value::Int(2)]);
        assert_eq!(ev.new_items, vec![Value::Int(9)]);
    }

    #[test]
    fn single_move() {
        let ev = event(
            &[1, 2, 3, 4, 5],
            &[2, 3, 4, 1, 5],
            ChangeSet {
                moves: vec![Move::new(0, 3)],
                ..ChangeSet::default()
            },
        )
        .unwrap();
        assert_eq!(ev.action, CollectionAction::Move);
        assert_eq!(ev.old_start, Some(0));
        assert_eq!(ev.new_start, Some(3));
        assert_eq!(ev.new_items, vec![Value::Int(1)]);
    }

    #[test]
    fn adjacent_moves_collapse() {
        let ev = event(
            &[1, 2, 3, 4, 5],
            &[3, 4, 1, 2, 5],
            ChangeSet {
                moves: vec![Move::new(0, 2), Move::new(1, 3)],
                ..ChangeSet::default()
            },
        )
        .unwrap();
        assert_eq!(ev.action, CollectionAction::Move);
        assert_eq!(ev.old_start, Some(0));
        assert_eq!(ev.new_start, Some(2));
        assert_eq!(ev.new_items, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn non_adjacent_moves_reset() {
        let ev = event(
            &[1, 2, 3, 4, 5],
            &[2, 1, 3, 5, 4],
            ChangeSet {
                moves: vec![Move::new(0, 1), Move::new(3, 4)],
                ..ChangeSet::default()
            },
        )
        .unwrap();
        assert_eq!(ev.action, CollectionAction::Reset);
    }

    #[test]
    fn modification_only_yields_nothing() {
        let ev = event(
            &[1],
            &[1],
            ChangeSet {
                modified: vec![0],
                new_modified: vec![0],
                ..ChangeSet::default()
            },
        );
        assert!(ev.is_none());
    }

    #[test]
    fn clear_is_reset() {
        let ev = event(
            &[1, 2],
            &[],
            ChangeSet {
                deleted: vec![0, 1],
                is_cleared: true,
                ..ChangeSet::default()
            },
        )
        .unwrap();
        assert_eq!(ev.action, CollectionAction::Reset);
    }

    #[test]
    fn initial_delivery_is_silent() {
        let notification = Notification {
            subscription: SubscriptionId(1),
            lineage: LineageId::new(7),
            state: CollectionState::Live(Arc::new(list(1, &[1]))),
            previous: None,
            changes: None,
        };
        assert!(CollectionChangedAdapter::new()
            .translate(&notification)
            .is_empty());
    }

    #[test]
    fn invalidation_has_invalid_sender_and_properties() {
        let notification = Notification {
            subscription: SubscriptionId(1),
            lineage: LineageId::new(7),
            state: CollectionState::Invalidated,
            previous: Some(Arc::new(list(1, &[1]))),
            changes: Some(ChangeSet {
                deleted: vec![0],
                is_reset: true,
                ..ChangeSet::default()
            }),
        };
        let events = CollectionChangedAdapter::new().translate(&notification);
        assert_eq!(events.len(), 3);
        match &events[0] {
            AdapterEvent::CollectionChanged(ev) => {
                assert_eq!(ev.action, CollectionAction::Reset);
                assert!(!ev.sender_valid);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(events[1], AdapterEvent::PropertyChanged("Count".into()));
        assert_eq!(events[2], AdapterEvent::PropertyChanged("Item[]".into()));
    }
}
