//! Per-task notes log.
//!
//! Each task keeps an append-only `notes.txt` in its directory. Editors
//! always submit their whole buffer, so [`unique_suffix`] extracts what was
//! added by stripping the longest common prefix with the stored log. This is
//! a heuristic, not a diff: an edit to earlier text logs everything after the
//! first changed character.

use std::fmt::Write as _;
use std::io::{self, Write as _};
use std::path::PathBuf;

use chrono::format::{Item, StrftimeItems};

use crate::store::{StoreError, TaskStore};

/// File name of the notes log inside a task directory.
pub const NOTES_FILE: &str = "notes.txt";

/// Default chrono format for entry timestamps.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Whether `format` parses as a chrono strftime format.
#[must_use]
pub fn is_valid_timestamp_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Returns the part of `incoming` past its longest common prefix with
/// `stored`, trimmed of surrounding whitespace.
///
/// Comparison is per `char`, so multi-byte text is never split.
#[must_use]
pub fn unique_suffix<'a>(stored: &str, incoming: &'a str) -> &'a str {
    let mut split = incoming.len();
    let mut stored_chars = stored.chars();
    for (offset, ch) in incoming.char_indices() {
        if stored_chars.next() != Some(ch) {
            split = offset;
            break;
        }
    }
    incoming[split..].trim()
}

/// What an append did to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteOutcome {
    /// A line was written.
    Appended(String),
    /// Nothing new was submitted; the log is untouched.
    Unchanged,
}

impl TaskStore {
    fn notes_path(&self, task_id: &str) -> Result<PathBuf, StoreError> {
        Ok(self.resolve(task_id)?.join(NOTES_FILE))
    }

    /// Returns the full notes log of a task, or an empty string if the task
    /// has no log yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] or [`StoreError::Io`] for any
    /// failure other than a missing file.
    pub fn read_notes(&self, task_id: &str) -> Result<String, StoreError> {
        let path = self.notes_path(task_id)?;
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(StoreError::io("unable to fetch notes")(e)),
        }
    }

    /// Appends whatever `incoming` adds beyond the stored log, stamped with
    /// the local time and `submitter`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] or [`StoreError::Io`].
    pub fn append_note(
        &self,
        task_id: &str,
        incoming: &str,
        submitter: &str,
    ) -> Result<NoteOutcome, StoreError> {
        let stored = self.read_notes(task_id)?;
        let added = unique_suffix(&stored, incoming);
        if added.is_empty() {
            tracing::debug!(task_id, "note unchanged, nothing appended");
            return Ok(NoteOutcome::Unchanged);
        }
        let line = self.entry_line(submitter, added);
        self.append_line(task_id, &stored, &line, "unable to save notes")?;
        tracing::info!(task_id, submitter, bytes = added.len(), "note appended");
        Ok(NoteOutcome::Appended(line))
    }

    /// Appends a status-change record. The labels are not validated.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] or [`StoreError::Io`].
    pub fn log_status_change(
        &self,
        task_id: &str,
        from: &str,
        to: &str,
        submitter: &str,
    ) -> Result<String, StoreError> {
        let stored = self.read_notes(task_id)?;
        let line = self.entry_line(
            submitter,
            &format!("Status changed from \"{from}\" to \"{to}\""),
        );
        self.append_line(task_id, &stored, &line, "unable to log status change")?;
        tracing::info!(task_id, from, to, submitter, "status change logged");
        Ok(line)
    }

    /// Deletes the notes log. A missing log counts as cleared.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] or [`StoreError::Io`] for any
    /// failure other than a missing file.
    pub fn clear_notes(&self, task_id: &str) -> Result<(), StoreError> {
        let path = self.notes_path(task_id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(task_id, "notes cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io("unable to clear notes")(e)),
        }
    }

    fn entry_line(&self, submitter: &str, text: &str) -> String {
        format!("{} - {submitter}: {text}", self.timestamp())
    }

    fn timestamp(&self) -> String {
        let now = chrono::Local::now();
        let mut out = String::new();
        if write!(out, "{}", now.format(&self.timestamp_format)).is_err() {
            return now.to_rfc3339();
        }
        out
    }

    fn append_line(
        &self,
        task_id: &str,
        stored: &str,
        line: &str,
        context: &str,
    ) -> Result<(), StoreError> {
        let path = self.notes_path(task_id)?;
        let mut entry = String::with_capacity(line.len() + 2);
        if !stored.is_empty() && !stored.ends_with('\n') {
            entry.push('\n');
        }
        entry.push_str(line);
        entry.push('\n');
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(StoreError::io(context))?;
        file.write_all(entry.as_bytes())
            .map_err(StoreError::io(context))
    }
}
