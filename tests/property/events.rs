//! Property-based tests for the live-update wire format.
//!
//! Uses proptest to verify:
//! 1. Arbitrary text never causes a panic in `decode` (returns `Err` gracefully).
//! 2. Any `taskUpdate` a client can produce is decoded back to the same value,
//!    so the relay's verbatim rebroadcast is understood by every receiver.
//! 3. Unknown fields sent by other clients are ignored rather than rejected.

use proptest::prelude::*;
use taskboard_proto::event::{self, BoardEvent};
use taskboard_proto::task::{TaskUpdate, WorkflowState};

/// Strategy for generating arbitrary `WorkflowState` values.
fn arb_state() -> impl Strategy<Value = WorkflowState> {
    prop_oneof![
        Just(WorkflowState::ToDo),
        Just(WorkflowState::InProgress),
        Just(WorkflowState::Done),
    ]
}

/// Strategy for generating arbitrary partial `TaskUpdate` values.
fn arb_update() -> impl Strategy<Value = TaskUpdate> {
    (
        "[a-zA-Z0-9 _/&-]{1,40}",
        proptest::option::of(".{0,40}"),
        proptest::option::of(arb_state()),
        proptest::option::of(any::<bool>()),
        proptest::option::of(0usize..5),
        any::<bool>(),
    )
        .prop_map(
            |(id, description, state, completed, custom_state, moved)| TaskUpdate {
                id,
                description,
                category: None,
                state,
                completed,
                custom_state,
                moved,
            },
        )
}

proptest! {
    #[test]
    fn decode_never_panics(text in ".*") {
        let _ = event::decode(&text);
    }

    #[test]
    fn client_updates_survive_relay(update in arb_update()) {
        let sent = BoardEvent::TaskUpdate(update);
        let frame = event::encode(&sent).unwrap();
        let received = event::decode(&frame).unwrap();
        prop_assert_eq!(received, sent);
    }

    #[test]
    fn extra_fields_are_ignored(id in "[a-z]{1,12}", extra in "[a-z]{1,12}") {
        let frame = format!(
            r#"{{"event":"taskUpdate","data":{{"id":"{id}","x_{extra}":42}}}}"#
        );
        let received = event::decode(&frame).unwrap();
        prop_assert_eq!(received, BoardEvent::TaskUpdate(TaskUpdate::touched(id)));
    }
}
