//! Download cache for remotely resolved artifacts.
//!
//! Cached files use the repository layout below the cache root, each with
//! a `.sha256` sidecar recording the digest observed at download time.

use std::path::{Path, PathBuf};

use stack_common::error::{Result, StackError};
use stack_common::types::{ArtifactCoordinate, Sha256Hash};

use crate::hash;
use crate::layout::repository_path;

/// Manages the local download cache.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    /// Root directory for all cached artifacts.
    root: PathBuf,
}

impl ArtifactCache {
    /// Opens the cache rooted at `root`. The directory is created lazily.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        tracing::debug!(path = %root.display(), "opening artifact cache");
        Self { root }
    }

    /// Returns the cache path of an artifact.
    #[must_use]
    pub fn artifact_path(&self, coordinate: &ArtifactCoordinate) -> PathBuf {
        self.root.join(repository_path(coordinate))
    }

    /// Checks whether an artifact is cached.
    #[must_use]
    pub fn has_artifact(&self, coordinate: &ArtifactCoordinate) -> bool {
        self.artifact_path(coordinate).is_file()
    }

    /// Writes downloaded content and its digest into the cache.
    ///
    /// The content goes through a temporary file so that an interrupted
    /// download never leaves a truncated artifact behind.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory or files cannot be written.
    pub fn store(
        &self,
        coordinate: &ArtifactCoordinate,
        content: &[u8],
        digest: &Sha256Hash,
    ) -> Result<PathBuf> {
        let path = self.artifact_path(coordinate);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StackError::io(parent, e))?;
        }
        let partial = path.with_extension("part");
        std::fs::write(&partial, content).map_err(|e| StackError::io(&partial, e))?;
        std::fs::write(hash::checksum_path(&path), format!("{}\n", digest.as_hex()))
            .map_err(|e| StackError::io(hash::checksum_path(&path), e))?;
        std::fs::rename(&partial, &path).map_err(|e| StackError::io(&path, e))?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "artifact cached");
        Ok(path)
    }

    /// Returns the root cache path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}
