//! In-memory task board with a persistent overlay.
//!
//! `Board` owns the merged task list the UI renders. Every mutation is
//! written through to the [`TaskCache`] so workflow state survives restarts,
//! and every local change returns the [`TaskUpdate`] the caller should
//! publish on the live-update channel.

use std::collections::BTreeMap;

use taskboard_proto::event::BoardEvent;
use taskboard_proto::task::{TaskRecord, TaskUpdate, WorkflowState, next_priority};

use crate::cache::TaskCache;
use crate::overlay::{apply_update, merge_overlay};

/// A workflow transition made locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    /// State before the transition.
    pub from: WorkflowState,
    /// State after the transition.
    pub to: WorkflowState,
    /// Full snapshot of the task after the transition.
    pub update: TaskUpdate,
}

/// The client's view of the board.
#[derive(Debug, Default)]
pub struct Board {
    tasks: Vec<TaskRecord>,
    cache: Option<TaskCache>,
}

impl Board {
    /// Creates a board seeded from the cache, if one is given.
    #[must_use]
    pub fn new(cache: Option<TaskCache>) -> Self {
        let tasks = cache.as_ref().map(TaskCache::load).unwrap_or_default();
        Self { tasks, cache }
    }

    /// All tasks in server order.
    #[must_use]
    pub fn tasks(&self) -> &[TaskRecord] {
        &self.tasks
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Replaces the list with a fresh server listing, keeping known workflow
    /// state for ids that are still present.
    pub fn reconcile(&mut self, server: &[TaskRecord]) {
        self.tasks = merge_overlay(server, &self.tasks);
        self.persist();
    }

    /// Advances a task to the next workflow state.
    ///
    /// Done tasks stay Done until they are archived or reset, so this returns
    /// `None` for them and for unknown ids.
    pub fn toggle_state(&mut self, id: &str) -> Option<StateChange> {
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        if task.state == WorkflowState::Done {
            return None;
        }
        let from = task.state;
        task.state = from.next();
        task.completed = task.state == WorkflowState::Done;
        let change = StateChange {
            from,
            to: task.state,
            update: TaskUpdate::from_record(task),
        };
        self.persist();
        Some(change)
    }

    /// Rotates a task's priority and returns the update to publish.
    pub fn rotate_priority(&mut self, id: &str) -> Option<TaskUpdate> {
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        task.custom_state = next_priority(task.custom_state);
        let update = TaskUpdate::from_record(task);
        self.persist();
        Some(update)
    }

    /// Drops a task, returning whether it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        let removed = self.tasks.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    /// Applies an event received on the live-update channel.
    ///
    /// Returns `true` if the board changed.
    pub fn apply_event(&mut self, event: &BoardEvent) -> bool {
        let changed = match event {
            BoardEvent::TaskUpdate(update) => apply_update(&mut self.tasks, update),
            BoardEvent::ResetTasks => {
                self.reset();
                return true;
            }
            BoardEvent::Error { reason } => {
                tracing::warn!(%reason, "server rejected a live-update frame");
                false
            }
        };
        if changed {
            self.persist();
        }
        changed
    }

    /// Drops the overlay: every task goes back to its discovered defaults.
    pub fn reset(&mut self) {
        for task in &mut self.tasks {
            task.state = WorkflowState::ToDo;
            task.completed = false;
            task.custom_state = 0;
        }
        self.persist();
    }

    /// Tasks grouped by category, categories sorted, server order inside each.
    #[must_use]
    pub fn categorized(&self) -> BTreeMap<&str, Vec<&TaskRecord>> {
        let mut groups: BTreeMap<&str, Vec<&TaskRecord>> = BTreeMap::new();
        for task in &self.tasks {
            groups.entry(task.category.as_str()).or_default().push(task);
        }
        groups
    }

    /// Task ids in the order [`Board::categorized`] renders them.
    #[must_use]
    pub fn display_order(&self) -> Vec<String> {
        self.categorized()
            .into_values()
            .flatten()
            .map(|t| t.id.clone())
            .collect()
    }

    fn persist(&self) {
        if let Some(cache) = &self.cache
            && let Err(e) = cache.save(&self.tasks)
        {
            tracing::warn!(error = %e, "failed to persist task cache");
        }
    }
}
