//! Build failures tagged with where they happened.

use stack_common::error::StackError;
use thiserror::Error;

use crate::state::BuildState;

/// A failed build: the stage, the layer or file in progress, and the cause.
#[derive(Debug, Error)]
#[error("build failed while {stage} ({subject}): {source}")]
pub struct BuildError {
    /// State the build was in when it failed.
    pub stage: BuildState,
    /// Layer label, file destination or directory being processed.
    pub subject: String,
    /// Underlying failure.
    #[source]
    pub source: StackError,
}

impl BuildError {
    /// Tags `source` with a stage and subject.
    pub fn new(stage: BuildState, subject: impl Into<String>, source: StackError) -> Self {
        Self {
            stage,
            subject: subject.into(),
            source,
        }
    }

    /// Whether every layer and file was written but the final manifest
    /// was not.
    #[must_use]
    pub const fn is_manifest_persist(&self) -> bool {
        matches!(self.stage, BuildState::PersistingManifest)
            && matches!(self.source, StackError::ManifestPersist { .. })
    }

    /// Whether a layer was applied but the checkpoint recording it could
    /// not be saved; later layers were not applied.
    #[must_use]
    pub const fn is_checkpoint_failure(&self) -> bool {
        !matches!(self.stage, BuildState::PersistingManifest)
            && matches!(self.source, StackError::ManifestPersist { .. })
    }

    /// Whether the build stopped because it was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.source, StackError::Cancelled)
    }
}

/// Result alias for build operations.
pub type BuildResult<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_stage_subject_and_cause() {
        let err = BuildError::new(
            BuildState::ApplyingDependencies,
            "widgets (com.example:widgets:1.0@jar)",
            StackError::config("boom"),
        );
        let message = err.to_string();
        assert!(message.contains("applying dependencies"));
        assert!(message.contains("widgets (com.example:widgets:1.0@jar)"));
        assert!(message.contains("boom"));
    }

    #[test]
    fn manifest_persist_is_distinguished() {
        let err = BuildError::new(
            BuildState::PersistingManifest,
            "/tmp/stack",
            StackError::ManifestPersist {
                path: "/tmp/stack/.stack.json".into(),
                source: std::io::Error::other("disk full"),
            },
        );
        assert!(err.is_manifest_persist());
        assert!(!err.is_checkpoint_failure());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn checkpoint_failure_is_not_a_final_persist_failure() {
        let err = BuildError::new(
            BuildState::ApplyingDependencies,
            "widgets",
            StackError::ManifestPersist {
                path: "/tmp/stack/.stack.json".into(),
                source: std::io::Error::other("disk full"),
            },
        );
        assert!(!err.is_manifest_persist());
        assert!(err.is_checkpoint_failure());
    }
}
