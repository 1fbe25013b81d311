//! Resolution from a local repository directory.

use std::path::{Path, PathBuf};

use stack_common::error::{ResolutionErrorKind, Result, StackError};
use stack_common::types::{ArtifactCoordinate, Sha256Hash};

use crate::hash;
use crate::layout::repository_path;
use crate::resolver::{ArtifactResolver, ResolvedArtifact};

/// A directory laid out like a Maven repository.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    /// Uses `root` as the repository directory. It need not exist.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        tracing::debug!(path = %root.display(), "opening local repository");
        Self { root }
    }

    /// Repository root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `coordinate` lives in this repository.
    #[must_use]
    pub fn artifact_path(&self, coordinate: &ArtifactCoordinate) -> PathBuf {
        self.root.join(repository_path(coordinate))
    }
}

impl ArtifactResolver for LocalRepository {
    fn name(&self) -> &str {
        "local"
    }

    fn resolve(&self, coordinate: &ArtifactCoordinate) -> Result<ResolvedArtifact> {
        let path = self.artifact_path(coordinate);
        if !path.is_file() {
            return Err(StackError::resolution(
                coordinate,
                ResolutionErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            ));
        }
        let fingerprint = verified_fingerprint(coordinate, &path)?;
        Ok(ResolvedArtifact {
            path,
            fingerprint: Some(fingerprint),
        })
    }
}

/// Fingerprints `path` and checks it against its sidecar, if any.
///
/// # Errors
///
/// Returns `ChecksumMismatch` if the sidecar disagrees with the content,
/// or an I/O error if either file cannot be read.
pub fn verified_fingerprint(coordinate: &ArtifactCoordinate, path: &Path) -> Result<Sha256Hash> {
    let actual = hash::hash_file(path)?;
    if let Some(expected) = hash::read_checksum(path)? {
        if expected != actual {
            return Err(StackError::resolution(
                coordinate,
                ResolutionErrorKind::ChecksumMismatch,
                format!("expected {expected}, found {actual}"),
            ));
        }
        tracing::debug!(path = %path.display(), "checksum verified");
    }
    Ok(actual)
}
