//! Property-based tests for overlay reconciliation.
//!
//! Uses proptest to verify:
//! 1. The merged list has exactly the server's ids, in the server's order.
//! 2. Merging is idempotent.
//! 3. Cached workflow fields win on matching ids; identity fields never do.
//! 4. Ids absent from the cache keep the server's defaults.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;

use proptest::prelude::*;
use taskboard::overlay::merge_overlay;
use taskboard_proto::task::{TaskRecord, WorkflowState};

fn arb_state() -> impl Strategy<Value = WorkflowState> {
    prop_oneof![
        Just(WorkflowState::ToDo),
        Just(WorkflowState::InProgress),
        Just(WorkflowState::Done),
    ]
}

fn arb_record(id: String) -> impl Strategy<Value = TaskRecord> {
    ("[a-z ]{0,12}", "[A-Z][a-z]{0,8}", arb_state(), any::<bool>(), 0usize..5).prop_map(
        move |(description, category, state, completed, custom_state)| TaskRecord {
            id: id.clone(),
            description,
            category,
            state,
            completed,
            custom_state,
        },
    )
}

/// A list of records with unique ids drawn from a small pool, so server and
/// cache lists overlap often.
fn arb_listing() -> impl Strategy<Value = Vec<TaskRecord>> {
    prop::collection::btree_set("[a-f]{1,2}", 0..10)
        .prop_flat_map(|ids| ids.into_iter().map(arb_record).collect::<Vec<_>>())
        .prop_shuffle()
}

proptest! {
    #[test]
    fn merge_keeps_server_ids_in_order(server in arb_listing(), cached in arb_listing()) {
        let merged = merge_overlay(&server, &cached);
        let merged_ids: Vec<_> = merged.iter().map(|t| &t.id).collect();
        let server_ids: Vec<_> = server.iter().map(|t| &t.id).collect();
        prop_assert_eq!(merged_ids, server_ids);
    }

    #[test]
    fn merge_is_idempotent(server in arb_listing(), cached in arb_listing()) {
        let once = merge_overlay(&server, &cached);
        let twice = merge_overlay(&server, &once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn cache_wins_for_workflow_and_server_for_identity(
        server in arb_listing(),
        cached in arb_listing(),
    ) {
        let by_id: HashMap<_, _> = cached.iter().map(|t| (t.id.as_str(), t)).collect();
        let merged = merge_overlay(&server, &cached);

        for (fresh, out) in server.iter().zip(&merged) {
            prop_assert_eq!(&out.description, &fresh.description);
            prop_assert_eq!(&out.category, &fresh.category);
            let source = by_id.get(fresh.id.as_str()).copied().unwrap_or(fresh);
            prop_assert_eq!(out.state, source.state);
            prop_assert_eq!(out.completed, source.completed);
            prop_assert_eq!(out.custom_state, source.custom_state);
        }
    }

    #[test]
    fn unseen_ids_get_defaults(ids in prop::collection::btree_set("[a-z]{1,6}", 0..8)) {
        let server: Vec<_> = ids
            .iter()
            .map(|id| TaskRecord::discovered(id.clone(), "Quality Open Projects"))
            .collect();
        let merged = merge_overlay(&server, &[]);
        for task in &merged {
            prop_assert_eq!(task.state, WorkflowState::ToDo);
            prop_assert!(!task.completed);
            prop_assert_eq!(task.custom_state, 0);
        }
    }
}
