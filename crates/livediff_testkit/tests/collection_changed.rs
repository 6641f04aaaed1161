//! Collection-changed events produced from live notifications.

use livediff_core::adapter::{COUNT_PROPERTY, INDEXER_PROPERTY};
use livediff_core::{CollectionAction, Value};
use livediff_testkit::prelude::*;

#[test]
fn initial_delivery_is_silent() {
    let harness = TestHarness::new();
    harness.add_person("Ada", 36);
    let events = EventRecorder::new();
    let _token = harness
        .people()
        .subscribe_collection_changed(events.handler())
        .unwrap();
    assert_eq!(harness.refresh(), 1);
    assert!(events.events().is_empty());
}

#[test]
fn append_is_an_add_with_properties() {
    let harness = TestHarness::new();
    let events = EventRecorder::new();
    let _token = harness
        .people()
        .subscribe_collection_changed(events.handler())
        .unwrap();
    harness.refresh();

    let ada = harness.add_person("Ada", 36);
    harness.refresh();

    let changed = events.collection_changed();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].action, CollectionAction::Add);
    assert_eq!(changed[0].new_start, Some(0));
    assert_eq!(changed[0].new_items, vec![Value::Object(ada)]);
    assert_eq!(
        events.property_names(),
        vec![COUNT_PROPERTY.to_string(), INDEXER_PROPERTY.to_string()]
    );
}

#[test]
fn removal_carries_old_items() {
    let harness = TestHarness::new();
    let (holder, people) = scenarios::holder_with_people(&harness, &["A", "B", "C"]);
    let events = EventRecorder::new();
    let _token = harness
        .property(holder, "ListDifferentType")
        .subscribe_collection_changed(events.handler())
        .unwrap();
    harness.refresh();

    harness.write(|txn| txn.list_remove(holder, "ListDifferentType", 1));
    harness.refresh();

    let changed = events.collection_changed();
    assert_eq!(changed[0].action, CollectionAction::Remove);
    assert_eq!(changed[0].old_start, Some(1));
    assert_eq!(changed[0].old_items, vec![Value::Object(people[1])]);
}

#[test]
fn single_move_is_a_move() {
    let harness = TestHarness::new();
    let (holder, people) =
        scenarios::holder_with_people(&harness, &["A", "B", "C", "D", "E"]);
    let events = EventRecorder::new();
    let _token = harness
        .property(holder, "ListDifferentType")
        .subscribe_collection_changed(events.handler())
        .unwrap();
    harness.refresh();

    harness.write(|txn| txn.list_move(holder, "ListDifferentType", 0, 3));
    harness.refresh();

    let changed = events.collection_changed();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].action, CollectionAction::Move);
    assert_eq!(changed[0].old_start, Some(0));
    assert_eq!(changed[0].new_start, Some(3));
    assert_eq!(changed[0].new_items, vec![Value::Object(people[0])]);
}

#[test]
fn adjacent_pair_moves_together() {
    let harness = TestHarness::new();
    let (holder, _) = scenarios::holder_with_people(&harness, &["A", "B", "C", "D", "E"]);
    let events = EventRecorder::new();
    let _token = harness
        .property(holder, "ListDifferentType")
        .subscribe_collection_changed(events.handler())
        .unwrap();
    harness.refresh();

    // [A, B, C, D, E] -> [C, D, A, B, E]
    harness.write(|txn| {
        txn.list_move(holder, "ListDifferentType", 0, 3)?;
        txn.list_move(holder, "ListDifferentType", 0, 3)
    });
    harness.refresh();

    let changed = events.collection_changed();
    assert_eq!(changed[0].action, CollectionAction::Move);
    assert_eq!(changed[0].old_start, Some(0));
    assert_eq!(changed[0].new_start, Some(2));
    assert_eq!(changed[0].new_items.len(), 2);
}

#[test]
fn replacing_a_list_element_is_a_replace() {
    let harness = TestHarness::new();
    let (holder, people) = scenarios::holder_with_people(&harness, &["A", "B", "C"]);
    let events = EventRecorder::new();
    let _token = harness
        .property(holder, "ListDifferentType")
        .subscribe_collection_changed(events.handler())
        .unwrap();
    harness.refresh();

    let newcomer = harness.write(|txn| {
        let newcomer = txn.create(PERSON)?;
        txn.list_set(holder, "ListDifferentType", 1, newcomer)?;
        Ok(newcomer)
    });
    harness.refresh();

    let changed = events.collection_changed();
    assert_eq!(changed[0].action, CollectionAction::Replace);
    assert_eq!(changed[0].old_start, Some(1));
    assert_eq!(changed[0].new_start, Some(1));
    assert_eq!(changed[0].old_items, vec![Value::Object(people[1])]);
    assert_eq!(changed[0].new_items, vec![Value::Object(newcomer)]);
}

#[test]
fn replacing_a_primitive_element_is_a_replace() {
    let harness = TestHarness::new();
    let ada = harness.write(|txn| {
        let ada = txn.create(PERSON)?;
        txn.list_push(ada, "Nicknames", "a")?;
        txn.list_push(ada, "Nicknames", "b")?;
        Ok(ada)
    });
    let events = EventRecorder::new();
    let _token = harness
        .property(ada, "Nicknames")
        .subscribe_collection_changed(events.handler())
        .unwrap();
    harness.refresh();

    harness.write(|txn| txn.list_set(ada, "Nicknames", 1, "z"));
    assert_eq!(harness.refresh(), 1);

    let changed = events.collection_changed();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].action, CollectionAction::Replace);
    assert_eq!(changed[0].old_start, Some(1));
    assert_eq!(changed[0].new_start, Some(1));
    assert_eq!(changed[0].old_items, vec![Value::from("b")]);
    assert_eq!(changed[0].new_items, vec![Value::from("z")]);
    assert_eq!(
        events.property_names(),
        vec![COUNT_PROPERTY.to_string(), INDEXER_PROPERTY.to_string()]
    );

    harness.write(|txn| txn.list_set(ada, "Nicknames", 1, "z"));
    assert_eq!(harness.refresh(), 0);
    assert_eq!(events.collection_changed().len(), 1);
}

#[test]
fn property_changes_produce_no_events() {
    let harness = TestHarness::new();
    let ada = harness.add_person("Ada", 36);
    let events = EventRecorder::new();
    let _token = harness
        .people()
        .subscribe_collection_changed(events.handler())
        .unwrap();
    harness.refresh();

    harness.set(ada, "FirstName", "Augusta");
    harness.refresh();
    assert!(events.events().is_empty());
}

#[test]
fn clearing_is_a_reset() {
    let harness = TestHarness::new();
    let (holder, _) = scenarios::holder_with_people(&harness, &["A", "B"]);
    let events = EventRecorder::new();
    let _token = harness
        .property(holder, "ListDifferentType")
        .subscribe_collection_changed(events.handler())
        .unwrap();
    harness.refresh();

    harness.write(|txn| txn.clear(holder, "ListDifferentType"));
    harness.refresh();

    let changed = events.collection_changed();
    assert_eq!(changed[0].action, CollectionAction::Reset);
    assert!(changed[0].sender_valid);
}

#[test]
fn invalidation_is_a_reset_of_an_invalid_sender() {
    let harness = TestHarness::new();
    let (holder, _) = scenarios::holder_with_people(&harness, &["A"]);
    let events = EventRecorder::new();
    let _token = harness
        .property(holder, "ListDifferentType")
        .subscribe_collection_changed(events.handler())
        .unwrap();
    harness.refresh();

    harness.write(|txn| txn.delete(holder));
    harness.refresh();

    let changed = events.collection_changed();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].action, CollectionAction::Reset);
    assert!(!changed[0].sender_valid);
}
