//! Two-step uploads: bytes are staged under a unique name, then moved into
//! the task folder once the conflict check passes.

use std::path::{Path, PathBuf};

use crate::archive;
use crate::store::{StoreError, TaskStore};

/// An uploaded file waiting in the staging directory.
///
/// Dropping it without committing removes the staged file.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    committed: bool,
}

impl StagedUpload {
    /// Location of the staged bytes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if !self.committed
            && let Err(e) = std::fs::remove_file(&self.path)
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to discard staged upload");
        }
    }
}

/// Reduces a client-supplied file name to its final path component.
///
/// # Errors
///
/// Returns [`StoreError::InvalidFileName`] when nothing usable remains.
pub fn sanitize_file_name(name: &str) -> Result<String, StoreError> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if last.is_empty() || last == "." || last == ".." || last.contains('\0') {
        return Err(StoreError::InvalidFileName(name.to_string()));
    }
    Ok(last.to_string())
}

impl TaskStore {
    /// Writes upload content to the staging directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the staging directory cannot be written.
    pub fn stage_upload(&self, bytes: &[u8]) -> Result<StagedUpload, StoreError> {
        std::fs::create_dir_all(&self.staging_dir)
            .map_err(StoreError::io("unable to stage upload"))?;
        let path = self.staging_dir.join(uuid::Uuid::now_v7().to_string());
        std::fs::write(&path, bytes).map_err(StoreError::io("unable to stage upload"))?;
        Ok(StagedUpload {
            path,
            committed: false,
        })
    }

    /// Moves a staged upload to `<folder>/<file name>`.
    ///
    /// Returns the stored file name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the target exists and `overwrite`
    /// is false (the existing file is left untouched), or
    /// [`StoreError::InvalidPath`], [`StoreError::InvalidFileName`],
    /// [`StoreError::Io`].
    pub fn commit_upload(
        &self,
        mut staged: StagedUpload,
        folder: &str,
        file_name: &str,
        overwrite: bool,
    ) -> Result<String, StoreError> {
        let name = sanitize_file_name(file_name)?;
        let target = self.resolve(folder)?.join(&name);
        if !overwrite && target.exists() {
            return Err(StoreError::Conflict(name));
        }
        archive::move_file(&staged.path, &target).map_err(StoreError::io("unable to upload file"))?;
        staged.committed = true;
        tracing::info!(folder, file = %name, overwrite, "upload stored");
        Ok(name)
    }
}
