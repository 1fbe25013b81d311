//! Removal of stack-relative files and the directories they leave empty.

use std::path::{Path, PathBuf};

use stack_common::error::{Result, StackError};

/// Outcome of removing a set of stack-relative paths.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Removal {
    /// Paths that were deleted.
    pub removed: Vec<PathBuf>,
    /// Paths that were already gone.
    pub missing: Vec<PathBuf>,
}

/// Deletes each of `paths` below `root`, then every parent directory left
/// empty, stopping at `root`.
pub fn remove_paths<'a>(root: &Path, paths: impl IntoIterator<Item = &'a PathBuf>) -> Result<Removal> {
    let mut removal = Removal::default();
    for relative in paths {
        let path = root.join(relative);
        match std::fs::symlink_metadata(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                removal.missing.push(relative.clone());
                continue;
            }
            Err(e) => return Err(StackError::io(&path, e)),
            Ok(metadata) if metadata.is_dir() => {
                std::fs::remove_dir_all(&path).map_err(|e| StackError::io(&path, e))?;
            }
            Ok(_) => std::fs::remove_file(&path).map_err(|e| StackError::io(&path, e))?,
        }
        tracing::debug!(path = %path.display(), "removed");
        removal.removed.push(relative.clone());
        remove_empty_parents(root, &path);
    }
    Ok(removal)
}

fn remove_empty_parents(root: &Path, path: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }
        // Fails on non-empty directories, which ends the walk.
        if std::fs::remove_dir(dir).is_err() {
            break;
        }
        current = dir.parent();
    }
}
