//! Local task cache.
//!
//! Holds the last merged task list, workflow fields included, in a single
//! JSON file. It is the only place workflow state survives a restart, since
//! the server never stores it.

use std::path::{Path, PathBuf};

use taskboard_proto::task::TaskRecord;

/// Errors that can occur while writing the cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Reading or writing the cache file failed.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The cache file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The task list could not be serialized.
    #[error("cache serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// File-backed store for the merged task list.
#[derive(Debug, Clone)]
pub struct TaskCache {
    path: PathBuf,
}

impl TaskCache {
    /// Creates a cache backed by the given file. Nothing is read yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the cached task list.
    ///
    /// A missing file is an empty cache. An unreadable or corrupt file is
    /// also treated as empty, with a warning, so a bad cache never blocks
    /// startup.
    #[must_use]
    pub fn load(&self) -> Vec<TaskRecord> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read task cache");
                return Vec::new();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring corrupt task cache");
                Vec::new()
            }
        }
    }

    /// Replaces the cached task list.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the list cannot be serialized or the file
    /// (or its parent directory) cannot be written.
    pub fn save(&self, tasks: &[TaskRecord]) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(tasks)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&self.path, json).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
