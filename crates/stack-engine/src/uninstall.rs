//! Removing a built stack.

use std::path::{Path, PathBuf};

use stack_common::error::{Result, StackError};
use stack_model::manifest::StackManifest;

use crate::cleanup;

/// What [`uninstall`] removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallReport {
    /// Files deleted, relative to the stack directory.
    pub removed: Vec<PathBuf>,
    /// Recorded files that were already gone.
    pub missing: Vec<PathBuf>,
    /// Deleted manifest.
    pub manifest: PathBuf,
}

/// Removes every file the manifest of `directory` accounts for, the
/// directories this leaves empty, and the manifest itself.
///
/// Files the manifest does not list are left in place.
///
/// # Errors
///
/// Returns `StackError::Config` if the directory has no manifest, or an
/// I/O error if a file cannot be removed.
pub fn uninstall(directory: &Path) -> Result<UninstallReport> {
    let manifest = StackManifest::load(directory)?.ok_or_else(|| {
        StackError::config(format!("no stack manifest in {}", directory.display()))
    })?;
    tracing::info!(
        directory = %directory.display(),
        layers = manifest.artifacts.len(),
        "uninstalling stack"
    );

    let mut owned: Vec<&PathBuf> = manifest.owned_paths().collect();
    owned.sort();
    owned.dedup();
    let removal = cleanup::remove_paths(directory, owned)?;

    let manifest_path = StackManifest::path(directory);
    std::fs::remove_file(&manifest_path).map_err(|e| StackError::io(&manifest_path, e))?;

    Ok(UninstallReport {
        removed: removal.removed,
        missing: removal.missing,
        manifest: manifest_path,
    })
}

#[cfg(test)]
mod tests {
    use stack_common::types::ArtifactCoordinate;
    use stack_model::dependency::LayerRole;
    use stack_model::record::InstalledArtifact;

    use super::*;

    #[test]
    fn uninstall_removes_recorded_files_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        std::fs::create_dir_all(root.join("lib")).expect("mkdir");
        std::fs::write(root.join("lib/w.jar"), b"w").expect("write");
        std::fs::create_dir_all(root.join("conf")).expect("mkdir");
        std::fs::write(root.join("conf/app.conf"), b"c").expect("write");
        std::fs::write(root.join("user.txt"), b"mine").expect("write");

        let record = InstalledArtifact::new(
            ArtifactCoordinate::new("com.example", "widgets", "1.0").expect("coordinate"),
            LayerRole::Regular,
            PathBuf::from("/repo/widgets-1.0.jar"),
            vec![PathBuf::from("lib/w.jar"), PathBuf::from("lib/gone.jar")],
            None,
        );
        let _ = StackManifest::new(root, vec![record], vec![PathBuf::from("conf/app.conf")], true)
            .save(root)
            .expect("save");

        let report = uninstall(root).expect("uninstall");

        assert_eq!(
            report.removed,
            vec![PathBuf::from("conf/app.conf"), PathBuf::from("lib/w.jar")]
        );
        assert_eq!(report.missing, vec![PathBuf::from("lib/gone.jar")]);
        assert!(!root.join("lib").exists());
        assert!(!root.join("conf").exists());
        assert!(!StackManifest::path(root).exists());
        assert!(root.join("user.txt").exists());
    }

    #[test]
    fn uninstall_without_manifest_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(uninstall(dir.path()), Err(StackError::Config { .. })));
    }
}
