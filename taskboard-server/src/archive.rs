//! Moving finished tasks from the active tree into the archive tree.
//!
//! The recursive move is not atomic. A failure part-way stops the walk and
//! leaves whatever was already moved in the archive; nothing is rolled back,
//! so a task can end up split across both roots.

use std::io;
use std::path::{Path, PathBuf};

use crate::store::{StoreError, TaskStore};

/// How [`TaskStore::archive`] relocates a task directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveStrategy {
    /// Mirror the tree entry by entry, removing each source directory once
    /// it is empty.
    #[default]
    Recursive,
    /// One rename of the whole tree, falling back to [`Self::Recursive`]
    /// across filesystems or when the archive already holds a folder for the
    /// task, so both strategies merge into earlier archives alike.
    Rename,
}

/// Renames `from` to `to`, copying then deleting when they live on
/// different filesystems.
///
/// # Errors
///
/// Returns the first I/O error encountered.
pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match std::fs::rename(from, to) {
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            std::fs::copy(from, to)?;
            std::fs::remove_file(from)
        }
        other => other,
    }
}

/// Moves every entry of `src` into `dst` (created if missing), then removes
/// `src`. Entries are visited in name order.
///
/// # Errors
///
/// Returns the first I/O error. Entries moved before it stay moved.
pub fn move_tree(src: &Path, dst: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dst)?;
    let mut entries = std::fs::read_dir(src)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(std::fs::DirEntry::file_name);
    for entry in entries {
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            move_tree(&from, &to)?;
        } else {
            move_file(&from, &to)?;
        }
    }
    std::fs::remove_dir(src)
}

impl TaskStore {
    /// Moves a task directory to the same relative path under the archive
    /// root, creating the archive root if needed.
    ///
    /// Returns the archived location.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] for a bad id, or
    /// [`StoreError::Io`] if the task does not exist or any step fails.
    pub fn archive(&self, task_id: &str) -> Result<PathBuf, StoreError> {
        const CONTEXT: &str = "unable to move task";
        let id = Self::normalize_id(task_id)?;
        let src = self.resolve(&id)?;
        if !src.is_dir() {
            return Err(StoreError::io(CONTEXT)(io::ErrorKind::NotFound.into()));
        }
        std::fs::create_dir_all(&self.archive_root).map_err(StoreError::io(CONTEXT))?;
        let dst = id
            .split('/')
            .fold(self.archive_root.clone(), |acc, s| acc.join(s));

        let result = match self.archive_strategy {
            ArchiveStrategy::Recursive => move_tree(&src, &dst),
            ArchiveStrategy::Rename => rename_tree(&src, &dst),
        };
        if let Err(e) = result {
            tracing::error!(
                task_id = %id,
                src = %src.display(),
                dst = %dst.display(),
                error = %e,
                "archive move failed, source may be partially moved"
            );
            return Err(StoreError::io(CONTEXT)(e));
        }
        tracing::info!(task_id = %id, dst = %dst.display(), "task archived");
        Ok(dst)
    }
}

fn rename_tree(src: &Path, dst: &Path) -> io::Result<()> {
    if dst.exists() {
        tracing::debug!(dst = %dst.display(), "archive folder exists, merging recursively");
        return move_tree(src, dst);
    }
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }
    match std::fs::rename(src, dst) {
        Err(e)
            if matches!(
                e.kind(),
                io::ErrorKind::CrossesDevices | io::ErrorKind::DirectoryNotEmpty
            ) =>
        {
            tracing::debug!(src = %src.display(), error = %e, "rename failed, moving recursively");
            move_tree(src, dst)
        }
        other => other,
    }
}
