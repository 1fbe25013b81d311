//! Build lifecycle states.

use std::fmt;

/// Where a build is in its lifecycle.
///
/// Builds move forward through
/// `Init → ResolvingBase → ApplyingDependencies → ApplyingFiles →
/// PersistingManifest → Done`; any non-terminal state may end in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BuildState {
    /// Validating the descriptor and loading the prior manifest.
    #[default]
    Init,
    /// Materializing the base layer.
    ResolvingBase,
    /// Materializing dependencies in declaration order.
    ApplyingDependencies,
    /// Copying additional files.
    ApplyingFiles,
    /// Writing the final manifest.
    PersistingManifest,
    /// The build completed.
    Done,
    /// The build stopped on an error.
    Failed,
}

impl BuildState {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Done | Self::Failed, _) => false,
            (_, Self::Failed) => true,
            (Self::Init, Self::ResolvingBase)
            | (Self::ResolvingBase, Self::ApplyingDependencies)
            | (Self::ApplyingDependencies, Self::ApplyingFiles)
            | (Self::ApplyingFiles, Self::PersistingManifest)
            | (Self::PersistingManifest, Self::Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::ResolvingBase => write!(f, "resolving base"),
            Self::ApplyingDependencies => write!(f, "applying dependencies"),
            Self::ApplyingFiles => write!(f, "applying files"),
            Self::PersistingManifest => write!(f, "persisting manifest"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_path_is_legal() {
        let path = [
            BuildState::Init,
            BuildState::ResolvingBase,
            BuildState::ApplyingDependencies,
            BuildState::ApplyingFiles,
            BuildState::PersistingManifest,
            BuildState::Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn failed_reachable_from_every_non_terminal_state() {
        for state in [
            BuildState::Init,
            BuildState::ResolvingBase,
            BuildState::ApplyingDependencies,
            BuildState::ApplyingFiles,
            BuildState::PersistingManifest,
        ] {
            assert!(state.can_transition_to(BuildState::Failed));
        }
    }

    #[test]
    fn terminal_states_are_final() {
        assert!(!BuildState::Done.can_transition_to(BuildState::Failed));
        assert!(!BuildState::Failed.can_transition_to(BuildState::Init));
        assert!(BuildState::Done.is_terminal());
        assert!(!BuildState::ApplyingFiles.is_terminal());
    }

    #[test]
    fn skipping_a_state_is_illegal() {
        assert!(!BuildState::Init.can_transition_to(BuildState::ApplyingFiles));
        assert!(!BuildState::ApplyingFiles.can_transition_to(BuildState::ApplyingDependencies));
    }
}
