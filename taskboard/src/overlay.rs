//! Pure merge functions for client-side task reconciliation.
//!
//! The server only knows which task directories exist. Workflow fields live
//! with clients, so every fresh listing is overlaid with the cached copy:
//! the server decides *which* tasks exist and what they are called, the
//! cache decides what state they are in.

use std::collections::HashMap;

use taskboard_proto::task::{TaskRecord, TaskUpdate};

/// Overlays cached workflow fields onto a fresh server listing.
///
/// The result contains exactly the server's ids, in the server's order.
/// For ids present in `cached`, `state`, `completed` and `custom_state` come
/// from the cache; everything else comes from the server. Ids the cache has
/// never seen keep the server's defaults, and cached ids the server no longer
/// lists are dropped.
#[must_use]
pub fn merge_overlay(server: &[TaskRecord], cached: &[TaskRecord]) -> Vec<TaskRecord> {
    let by_id: HashMap<&str, &TaskRecord> = cached.iter().map(|t| (t.id.as_str(), t)).collect();

    server
        .iter()
        .map(|fresh| {
            let mut merged = fresh.clone();
            if let Some(known) = by_id.get(fresh.id.as_str()) {
                merged.state = known.state;
                merged.completed = known.completed;
                merged.custom_state = known.custom_state;
            }
            merged
        })
        .collect()
}

/// Applies one `taskUpdate` payload to a task list.
///
/// - `moved` removes the task.
/// - Otherwise every present field is assigned onto the matching record, or
///   a new record is appended (starting from discovered defaults) when the id
///   is unknown and the update carries fields. An id-only update for an
///   unknown id (an upload into a subfolder, say) is left to the next
///   re-fetch.
///
/// Returns `true` if the list changed.
pub fn apply_update(tasks: &mut Vec<TaskRecord>, update: &TaskUpdate) -> bool {
    if update.moved {
        let before = tasks.len();
        tasks.retain(|t| t.id != update.id);
        return tasks.len() != before;
    }

    let (index, appended) = match tasks.iter().position(|t| t.id == update.id) {
        Some(i) => (i, false),
        None if !update.has_fields() => return false,
        None => {
            let category = update.category.clone().unwrap_or_default();
            tasks.push(TaskRecord::discovered(update.id.clone(), category));
            (tasks.len() - 1, true)
        }
    };
    let task = &mut tasks[index];
    let before = task.clone();

    if let Some(description) = &update.description {
        task.description.clone_from(description);
    }
    if let Some(category) = &update.category {
        task.category.clone_from(category);
    }
    if let Some(state) = update.state {
        task.state = state;
    }
    if let Some(completed) = update.completed {
        task.completed = completed;
    }
    if let Some(custom_state) = update.custom_state {
        task.custom_state = custom_state;
    }

    appended || *task != before
}
