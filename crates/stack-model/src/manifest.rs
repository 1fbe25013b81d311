//! The `.stack.json` build manifest.
//!
//! The manifest is the only state carried from one build to the next. It
//! is rewritten after every applied layer, so an interrupted build leaves
//! a manifest describing exactly the layers that completed.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stack_common::constants::{MANIFEST_FILE_NAME, MANIFEST_VERSION};
use stack_common::error::{Result, StackError};
use stack_common::paths::normalize_destination;
use stack_common::types::ArtifactCoordinate;

use crate::dependency::LayerRole;
use crate::record::InstalledArtifact;

/// Persisted description of a built stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackManifest {
    /// Manifest format version.
    pub version: u32,
    /// Stack directory the manifest describes.
    pub directory: PathBuf,
    /// Resolved base identity, if the stack has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<ArtifactCoordinate>,
    /// Applied layers, base first, in declaration order.
    pub artifacts: Vec<InstalledArtifact>,
    /// Additional files written by the last complete build.
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// Whether the build that wrote this manifest ran to completion.
    pub complete: bool,
    /// RFC 3339 timestamp of the write.
    pub written_at: String,
}

impl StackManifest {
    /// Creates a manifest for `artifacts`, deriving the base identity.
    #[must_use]
    pub fn new(directory: &Path, artifacts: Vec<InstalledArtifact>, files: Vec<PathBuf>, complete: bool) -> Self {
        let base = artifacts
            .iter()
            .find(|a| a.role == LayerRole::Base)
            .map(|a| a.coordinate.clone());
        Self {
            version: MANIFEST_VERSION,
            directory: directory.to_path_buf(),
            base,
            artifacts,
            files,
            complete,
            written_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Location of the manifest for the stack rooted at `stack_root`.
    #[must_use]
    pub fn path(stack_root: &Path) -> PathBuf {
        stack_root.join(MANIFEST_FILE_NAME)
    }

    /// Loads the manifest of `stack_root`, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed,
    /// was written by a newer format version, or lists a path that is not
    /// strictly below the stack root.
    pub fn load(stack_root: &Path) -> Result<Option<Self>> {
        let path = Self::path(stack_root);
        if !path.exists() {
            return Ok(None);
        }
        tracing::debug!(path = %path.display(), "loading stack manifest");
        let content = std::fs::read_to_string(&path).map_err(|e| StackError::io(&path, e))?;
        let manifest: Self = serde_json::from_str(&content)?;
        if manifest.version > MANIFEST_VERSION {
            return Err(StackError::config(format!(
                "manifest {} has format version {}, newer than supported {MANIFEST_VERSION}",
                path.display(),
                manifest.version
            )));
        }
        for owned in manifest.owned_paths() {
            let _ = normalize_destination(owned).map_err(|e| {
                StackError::config(format!("manifest {} is not usable: {e}", path.display()))
            })?;
        }
        Ok(Some(manifest))
    }

    /// Writes the manifest to `stack_root`, replacing any previous one.
    ///
    /// The content goes to a temporary sibling first and is renamed into
    /// place, so readers never observe a half-written manifest.
    ///
    /// # Errors
    ///
    /// Returns `StackError::ManifestPersist` if the file cannot be written.
    pub fn save(&self, stack_root: &Path) -> Result<PathBuf> {
        let path = Self::path(stack_root);
        let json = serde_json::to_string_pretty(self)?;
        let staging = path.with_extension("json.tmp");
        std::fs::write(&staging, json).map_err(|e| StackError::ManifestPersist {
            path: path.clone(),
            source: e,
        })?;
        std::fs::rename(&staging, &path).map_err(|e| StackError::ManifestPersist {
            path: path.clone(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), records = self.artifacts.len(), "manifest written");
        Ok(path)
    }

    /// Every stack-relative file the manifest accounts for.
    pub fn owned_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.artifacts
            .iter()
            .flat_map(|a| a.destinations.iter())
            .chain(self.files.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stack_common::types::Sha256Hash;

    fn record(name: &str, role: LayerRole) -> InstalledArtifact {
        let coordinate = ArtifactCoordinate::new("com.example", name, "1.0").expect("valid");
        InstalledArtifact::new(
            coordinate,
            role,
            PathBuf::from(format!("/repo/{name}.zip")),
            vec![PathBuf::from(format!("lib/{name}.jar"))],
            Some(Sha256Hash::from_hex("d".repeat(64)).expect("valid")),
        )
    }

    #[test]
    fn load_without_manifest_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(StackManifest::load(dir.path()).expect("load").is_none());
    }

    #[test]
    fn save_then_load_preserves_record_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = StackManifest::new(
            dir.path(),
            vec![record("dist", LayerRole::Base), record("widgets", LayerRole::Regular)],
            vec![PathBuf::from("conf/app.conf")],
            true,
        );
        let path = manifest.save(dir.path()).expect("save");
        assert!(path.ends_with(".stack.json"));
        assert!(!dir.path().join(".stack.json.tmp").exists());

        let loaded = StackManifest::load(dir.path()).expect("load").expect("present");
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.base.as_ref().map(ArtifactCoordinate::name), Some("dist"));
        let names: Vec<_> = loaded.artifacts.iter().map(|a| a.coordinate.name()).collect();
        assert_eq!(names, vec!["dist", "widgets"]);
    }

    #[test]
    fn save_into_missing_directory_is_persist_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope");
        let manifest = StackManifest::new(&missing, Vec::new(), Vec::new(), true);
        assert!(matches!(
            manifest.save(&missing),
            Err(StackError::ManifestPersist { .. })
        ));
    }

    #[test]
    fn load_rejects_newer_format() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut manifest = StackManifest::new(dir.path(), Vec::new(), Vec::new(), true);
        manifest.version = MANIFEST_VERSION + 1;
        let _ = manifest.save(dir.path()).expect("save");
        assert!(StackManifest::load(dir.path()).is_err());
    }

    #[test]
    fn owned_paths_cover_records_and_files() {
        let manifest = StackManifest::new(
            Path::new("/opt/stack"),
            vec![record("widgets", LayerRole::Regular)],
            vec![PathBuf::from("conf/app.conf")],
            true,
        );
        let owned: Vec<_> = manifest.owned_paths().cloned().collect();
        assert_eq!(
            owned,
            vec![PathBuf::from("lib/widgets.jar"), PathBuf::from("conf/app.conf")]
        );
    }

    #[test]
    fn load_rejects_paths_outside_the_root() {
        for bad in ["../../x", "/etc/passwd", "."] {
            let dir = tempfile::tempdir().expect("tempdir");
            let mut tampered = record("widgets", LayerRole::Regular);
            tampered.destinations.push(PathBuf::from(bad));
            let manifest = StackManifest::new(dir.path(), vec![tampered], Vec::new(), true);
            let _ = manifest.save(dir.path()).expect("save");
            assert!(
                matches!(StackManifest::load(dir.path()), Err(StackError::Config { .. })),
                "{bad} must be rejected"
            );
        }

        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = StackManifest::new(dir.path(), Vec::new(), vec![PathBuf::from("../notes")], true);
        let _ = manifest.save(dir.path()).expect("save");
        assert!(StackManifest::load(dir.path()).is_err());
    }
}
