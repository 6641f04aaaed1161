//! Property tests for change sets.

use livediff_core::{DiffEngine, DirtySet, KeyPathFilter, Move};
use livediff_testkit::prelude::*;
use proptest::prelude::*;

fn full() -> KeyPathFilter {
    KeyPathFilter::unchecked_full(4)
}

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn change_sets_replay_to_the_new_order(
        start in rows_strategy(24),
        edits in edit_script_strategy(0, 16),
    ) {
        let old = snapshot_of(1, &start);
        let new = snapshot_of(2, &apply_edits(&start, &edits));
        let changes = DiffEngine::new()
            .diff(Some(&old), &new, &full(), &DirtySet::new())
            .unwrap()
            .unwrap();
        prop_assert_eq!(verify_change_set(&old, &new, &changes), Ok(()));
    }

    #[test]
    fn moves_only_when_order_changed(
        start in rows_strategy(24),
        edits in edit_script_strategy(0, 16),
    ) {
        let old = snapshot_of(1, &start);
        let new = snapshot_of(2, &apply_edits(&start, &edits));
        let changes = DiffEngine::new()
            .diff(Some(&old), &new, &full(), &DirtySet::new())
            .unwrap()
            .unwrap();

        let survivors_in_new_order: Vec<usize> = new
            .keys()
            .filter_map(|key| old.position(key))
            .collect();
        let sorted = survivors_in_new_order.windows(2).all(|w| w[0] < w[1]);
        prop_assert_eq!(changes.moves.is_empty(), sorted);
    }

    #[test]
    fn shallow_never_reports_modifications(
        start in rows_strategy(16),
        edits in edit_script_strategy(0, 12),
    ) {
        let old = snapshot_of(1, &start);
        let new = snapshot_of(2, &apply_edits(&start, &edits));
        let changes = DiffEngine::new()
            .diff(Some(&old), &new, &KeyPathFilter::shallow(), &DirtySet::new())
            .unwrap()
            .unwrap();
        prop_assert!(changes.modified.is_empty());
        prop_assert!(changes.new_modified.is_empty());
    }
}

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn single_list_move_round_trips(from in 0usize..5, to in 0usize..5) {
        prop_assume!(from != to);
        let harness = TestHarness::new();
        let (holder, _) = scenarios::holder_with_people(&harness, &["A", "B", "C", "D", "E"]);
        let recorder = Recorder::new();
        let _token = harness
            .property(holder, "ListDifferentType")
            .subscribe(recorder.callback(), None)
            .unwrap();
        harness.refresh();

        harness.write(|txn| txn.list_move(holder, "ListDifferentType", from, to));
        prop_assert_eq!(harness.refresh(), 1);
        let forward = recorder.last_changes().unwrap();

        harness.write(|txn| txn.list_move(holder, "ListDifferentType", to, from));
        prop_assert_eq!(harness.refresh(), 1);
        let back = recorder.last_changes().unwrap();

        for (changes, (i, j)) in [(forward, (from, to)), (back, (to, from))] {
            prop_assert!(changes.inserted.is_empty() && changes.deleted.is_empty());
            // Swapping neighbors is ambiguous; the earlier entry is reported.
            let expected = if i.abs_diff(j) == 1 {
                Move::new(i.min(j), i.max(j))
            } else {
                Move::new(i, j)
            };
            prop_assert_eq!(changes.moves, vec![expected]);
        }
    }
}
