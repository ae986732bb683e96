//! Task records as seen by clients.
//!
//! A task is a directory under the server's tasks root; its identity is the
//! directory path relative to that root. The workflow fields (`state`,
//! `completed`, `customState`) are never persisted by the server: clients keep
//! them in their local cache and propagate changes through the live-update
//! channel.

use serde::{Deserialize, Serialize};

/// Ordered priority labels a task's `customState` indexes into.
pub const PRIORITY_LABELS: [&str; 5] = ["Minor", "Low", "Normal", "Important", "Urgent"];

/// Returns the priority label for an index, wrapping out-of-range values.
#[must_use]
pub const fn priority_label(index: usize) -> &'static str {
    PRIORITY_LABELS[index % PRIORITY_LABELS.len()]
}

/// Returns the index following `index` in the priority rotation.
#[must_use]
pub const fn next_priority(index: usize) -> usize {
    (index % PRIORITY_LABELS.len() + 1) % PRIORITY_LABELS.len()
}

/// Workflow state of a task on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WorkflowState {
    /// Not started.
    #[default]
    #[serde(rename = "To Do")]
    ToDo,
    /// Actively being worked on.
    #[serde(rename = "In Progress")]
    InProgress,
    /// Finished; eligible for archiving.
    #[serde(rename = "Done")]
    Done,
}

impl WorkflowState {
    /// All states in display order.
    pub const ALL: [Self; 3] = [Self::ToDo, Self::InProgress, Self::Done];

    /// The state that follows this one in the cycle.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::ToDo => Self::InProgress,
            Self::InProgress => Self::Done,
            Self::Done => Self::ToDo,
        }
    }

    /// Display label, identical to the wire representation.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ToDo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A task as listed by `GET /tasks` and cached by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// Directory path relative to the tasks root.
    pub id: String,
    /// Human-readable description (defaults to the id).
    pub description: String,
    /// Board column / grouping label.
    pub category: String,
    /// Client-local workflow state.
    #[serde(default)]
    pub state: WorkflowState,
    /// Client-local completion flag.
    #[serde(default)]
    pub completed: bool,
    /// Client-local index into [`PRIORITY_LABELS`].
    #[serde(default)]
    pub custom_state: usize,
}

impl TaskRecord {
    /// Creates the record for a freshly discovered task directory.
    #[must_use]
    pub fn discovered(id: impl Into<String>, category: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            description: id.clone(),
            id,
            category: category.into(),
            state: WorkflowState::ToDo,
            completed: false,
            custom_state: 0,
        }
    }

    /// The priority label of this task.
    #[must_use]
    pub const fn priority(&self) -> &'static str {
        priority_label(self.custom_state)
    }
}

/// One child of a browsed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderEntry {
    /// File or directory name.
    pub name: String,
    /// Whether the entry is a directory.
    pub is_folder: bool,
}

/// A partial or full task record carried by a `taskUpdate` event.
///
/// Only `id` is required. `moved` marks a task that left the active set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    /// Task the update refers to.
    pub id: String,
    /// New description, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New category, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// New workflow state, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<WorkflowState>,
    /// New completion flag, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// New priority index, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_state: Option<usize>,
    /// The task directory was moved to the archive root.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub moved: bool,
}

impl TaskUpdate {
    /// An id-only update: "something about this task changed, re-fetch".
    #[must_use]
    pub fn touched(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// An update announcing the task was archived.
    #[must_use]
    pub fn moved(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            moved: true,
            ..Self::default()
        }
    }

    /// Whether the update carries any record field besides the id.
    #[must_use]
    pub const fn has_fields(&self) -> bool {
        self.description.is_some()
            || self.category.is_some()
            || self.state.is_some()
            || self.completed.is_some()
            || self.custom_state.is_some()
    }

    /// A full snapshot of a task record.
    #[must_use]
    pub fn from_record(record: &TaskRecord) -> Self {
        Self {
            id: record.id.clone(),
            description: Some(record.description.clone()),
            category: Some(record.category.clone()),
            state: Some(record.state),
            completed: Some(record.completed),
            custom_state: Some(record.custom_state),
            moved: false,
        }
    }
}
