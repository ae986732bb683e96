//! Property-based tests for note deduplication.
//!
//! Uses proptest to verify:
//! 1. Resubmitting the stored log never adds anything.
//! 2. A pure append yields exactly the appended text, trimmed.
//! 3. The suffix is always a trimmed tail of the incoming text.
//! 4. Through the store, a pure append grows the log by exactly one line.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;
use taskboard_server::notes::{NoteOutcome, unique_suffix};
use taskboard_server::store::TaskStore;

proptest! {
    #[test]
    fn identical_text_has_empty_suffix(log in "\\PC{0,200}") {
        prop_assert_eq!(unique_suffix(&log, &log), "");
    }

    #[test]
    fn pure_append_yields_addition(
        log in "\\PC{0,120}",
        addition in "[a-zA-Z0-9][a-zA-Z0-9 .,!?]{0,60}[a-zA-Z0-9]",
    ) {
        let incoming = format!("{log}{addition}");
        prop_assert_eq!(unique_suffix(&log, &incoming), addition.as_str());
    }

    #[test]
    fn suffix_is_a_tail_of_incoming(stored in "\\PC{0,80}", incoming in "\\PC{0,80}") {
        let suffix = unique_suffix(&stored, &incoming);
        prop_assert!(incoming.trim_end().ends_with(suffix));
        prop_assert_eq!(suffix, suffix.trim());
    }

    #[test]
    fn store_append_adds_one_line(
        first in "[a-z]{1,20}( [a-z]{1,20}){0,4}",
        second in "[a-z]{1,20}( [a-z]{1,20}){0,4}",
    ) {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::new(dir.path().join("tasks"), dir.path().join("done"));
        std::fs::create_dir_all(store.tasks_root().join("alpha")).unwrap();

        store.append_note("alpha", &first, "127.0.0.1").unwrap();
        let before = store.read_notes("alpha").unwrap();

        let outcome = store
            .append_note("alpha", &format!("{before}{second}"), "127.0.0.1")
            .unwrap();
        prop_assert!(matches!(outcome, NoteOutcome::Appended(_)));

        let after = store.read_notes("alpha").unwrap();
        prop_assert!(after.starts_with(&before));
        let added: Vec<_> = after[before.len()..].lines().collect();
        prop_assert_eq!(added.len(), 1);
        let expected_tail = format!(": {second}");
        prop_assert!(added[0].ends_with(&expected_tail));

        let resubmit = store.append_note("alpha", &after, "127.0.0.1").unwrap();
        prop_assert_eq!(resubmit, NoteOutcome::Unchanged);
    }
}
