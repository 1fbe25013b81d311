//! Records of layers a build placed on disk.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stack_common::types::{ArtifactCoordinate, Sha256Hash};

use crate::dependency::LayerRole;

/// What one successful layer application wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledArtifact {
    /// Artifact that was applied.
    pub coordinate: ArtifactCoordinate,
    /// Whether the layer was the base or a regular dependency.
    pub role: LayerRole,
    /// Local file the artifact was resolved to.
    pub source: PathBuf,
    /// Files written, relative to the stack root.
    pub destinations: Vec<PathBuf>,
    /// Fingerprint of the resolved artifact, when the resolver had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Sha256Hash>,
    /// RFC 3339 timestamp of the application.
    pub installed_at: String,
}

impl InstalledArtifact {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(
        coordinate: ArtifactCoordinate,
        role: LayerRole,
        source: PathBuf,
        destinations: Vec<PathBuf>,
        fingerprint: Option<Sha256Hash>,
    ) -> Self {
        Self {
            coordinate,
            role,
            source,
            destinations,
            fingerprint,
            installed_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Whether this record describes `coordinate` resolved to `fingerprint`.
    ///
    /// A missing fingerprint on either side never matches, so such layers
    /// are always re-applied.
    #[must_use]
    pub fn matches(&self, coordinate: &ArtifactCoordinate, fingerprint: Option<&Sha256Hash>) -> bool {
        match (&self.fingerprint, fingerprint) {
            (Some(recorded), Some(current)) => {
                self.coordinate == *coordinate && recorded == current
            }
            _ => false,
        }
    }

    /// Whether every recorded destination still exists below `stack_root`.
    #[must_use]
    pub fn is_intact(&self, stack_root: &Path) -> bool {
        self.destinations
            .iter()
            .all(|destination| stack_root.join(destination).exists())
    }

    /// Version-less identity shared by every version of the same layer.
    #[must_use]
    pub fn key(&self) -> String {
        self.coordinate.key()
    }
}
