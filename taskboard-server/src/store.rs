//! Directory-backed task store.
//!
//! The [`TaskStore`] maps task ids (paths relative to the tasks root) onto
//! the filesystem. It performs no locking: concurrent writers to the same
//! notes log or concurrent archive moves of the same task race, and the last
//! one to finish wins. Every operation is synchronous; async callers run them
//! on the blocking pool.

use std::io;
use std::path::{Path, PathBuf};

use taskboard_proto::task::{FolderEntry, TaskRecord};

use crate::archive::ArchiveStrategy;

/// Category assigned to every task in the flat layout unless configured.
pub const DEFAULT_CATEGORY_LABEL: &str = "Quality Open Projects";

/// Errors produced by store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The path is empty, absolute, or escapes the tasks root.
    #[error("invalid task path: {0}")]
    InvalidPath(String),

    /// An uploaded file name has no usable final component.
    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    /// The upload target exists and overwrite was not requested.
    #[error("file already exists: {0}")]
    Conflict(String),

    /// A filesystem operation failed.
    #[error("{context}: {source}")]
    Io {
        /// What the store was trying to do, safe to show to callers.
        context: String,
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl StoreError {
    /// Builds a closure wrapping an [`io::Error`] with context, for `map_err`.
    pub(crate) fn io(context: impl Into<String>) -> impl FnOnce(io::Error) -> Self {
        let context = context.into();
        move |source| Self::Io { context, source }
    }
}

/// How task directories are arranged under the tasks root.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskLayout {
    /// Each directory directly under the root is a task.
    #[default]
    Flat,
    /// Each top-level directory is a category holding task directories.
    Grouped,
}

/// The result of browsing a path below the tasks root.
#[derive(Debug)]
pub enum Browse {
    /// The path is a directory; its immediate children.
    Folder(Vec<FolderEntry>),
    /// The path is a regular file; its contents.
    File(Vec<u8>),
}

/// Filesystem-backed task store.
#[derive(Debug, Clone)]
pub struct TaskStore {
    pub(crate) tasks_root: PathBuf,
    pub(crate) archive_root: PathBuf,
    pub(crate) staging_dir: PathBuf,
    pub(crate) layout: TaskLayout,
    pub(crate) category_label: String,
    pub(crate) archive_strategy: ArchiveStrategy,
    pub(crate) timestamp_format: String,
}

impl TaskStore {
    /// Creates a store over the given active and archive roots with the
    /// flat layout, recursive archiving, and a staging directory under the
    /// system temp dir.
    #[must_use]
    pub fn new(tasks_root: impl Into<PathBuf>, archive_root: impl Into<PathBuf>) -> Self {
        Self {
            tasks_root: tasks_root.into(),
            archive_root: archive_root.into(),
            staging_dir: std::env::temp_dir().join("taskboard-uploads"),
            layout: TaskLayout::Flat,
            category_label: DEFAULT_CATEGORY_LABEL.to_string(),
            archive_strategy: ArchiveStrategy::Recursive,
            timestamp_format: crate::notes::DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }

    /// Builds a store from a resolved server configuration.
    #[must_use]
    pub fn from_config(config: &crate::config::ServerConfig) -> Self {
        Self::new(&config.tasks_root, &config.archive_root)
            .with_layout(config.layout)
            .with_category_label(config.category_label.clone())
            .with_staging_dir(&config.staging_dir)
            .with_archive_strategy(config.archive_strategy)
            .with_timestamp_format(config.timestamp_format.clone())
    }

    /// Sets the task directory layout.
    #[must_use]
    pub const fn with_layout(mut self, layout: TaskLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Sets the category label used by the flat layout.
    #[must_use]
    pub fn with_category_label(mut self, label: impl Into<String>) -> Self {
        self.category_label = label.into();
        self
    }

    /// Sets the directory uploads are staged in.
    #[must_use]
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    /// Sets how archive moves are performed.
    #[must_use]
    pub const fn with_archive_strategy(mut self, strategy: ArchiveStrategy) -> Self {
        self.archive_strategy = strategy;
        self
    }

    /// Sets the chrono format used for note timestamps.
    #[must_use]
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    /// Root of the active task tree.
    #[must_use]
    pub fn tasks_root(&self) -> &Path {
        &self.tasks_root
    }

    /// Root of the archive tree.
    #[must_use]
    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    /// Normalises a slash-separated task path into its id form.
    ///
    /// Empty segments are dropped. `.`/`..` segments and backslashes are
    /// rejected so no id can name anything outside the tasks root.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] for empty or escaping paths.
    pub fn normalize_id(path: &str) -> Result<String, StoreError> {
        let mut segments = Vec::new();
        for segment in path.split('/') {
            if segment.is_empty() {
                continue;
            }
            if segment == "." || segment == ".." || segment.contains(['\\', '\0']) {
                return Err(StoreError::InvalidPath(path.to_string()));
            }
            segments.push(segment);
        }
        if segments.is_empty() {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(segments.join("/"))
    }

    /// Resolves a task path to its location under the tasks root.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] for empty or escaping paths.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let id = Self::normalize_id(path)?;
        Ok(id.split('/').fold(self.tasks_root.clone(), |acc, s| acc.join(s)))
    }

    /// Lists every task under the tasks root, sorted by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the root (or, in the grouped layout, a
    /// category directory) cannot be read.
    pub fn list_tasks(&self) -> Result<Vec<TaskRecord>, StoreError> {
        let top = sorted_dir_names(&self.tasks_root, "unable to fetch tasks")?;
        let mut tasks = Vec::new();
        match self.layout {
            TaskLayout::Flat => {
                for (name, is_dir) in top {
                    if is_dir {
                        tasks.push(TaskRecord::discovered(name, self.category_label.clone()));
                    }
                }
            }
            TaskLayout::Grouped => {
                for (category, is_dir) in top {
                    if !is_dir {
                        continue;
                    }
                    let children = sorted_dir_names(
                        &self.tasks_root.join(&category),
                        "unable to fetch tasks",
                    )?;
                    for (name, is_dir) in children {
                        if is_dir {
                            tasks.push(TaskRecord::discovered(
                                format!("{category}/{name}"),
                                category.clone(),
                            ));
                        }
                    }
                }
            }
        }
        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tasks)
    }

    /// Lists the immediate children of a task directory, sorted by name.
    ///
    /// Missing and unreadable paths are not distinguished.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] or [`StoreError::Io`].
    pub fn list_folder(&self, path: &str) -> Result<Vec<FolderEntry>, StoreError> {
        let dir = self.resolve(path)?;
        let entries = sorted_dir_names(&dir, "unable to fetch folder contents")?;
        Ok(entries
            .into_iter()
            .map(|(name, is_folder)| FolderEntry { name, is_folder })
            .collect())
    }

    /// Lists a directory or reads a file, whichever the path names.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] or [`StoreError::Io`].
    pub fn browse(&self, path: &str) -> Result<Browse, StoreError> {
        let target = self.resolve(path)?;
        if target.is_file() {
            self.read_file(path).map(Browse::File)
        } else {
            self.list_folder(path).map(Browse::Folder)
        }
    }

    /// Reads a file below the tasks root.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPath`] or [`StoreError::Io`].
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let target = self.resolve(path)?;
        std::fs::read(&target).map_err(StoreError::io("unable to read file"))
    }
}

/// Reads a directory and returns `(name, is_dir)` pairs sorted by name.
///
/// Symlinks are followed when deciding whether an entry is a directory.
fn sorted_dir_names(dir: &Path, context: &str) -> Result<Vec<(String, bool)>, StoreError> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(StoreError::io(context))? {
        let entry = entry.map_err(StoreError::io(context))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        out.push((name, entry.path().is_dir()));
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}
