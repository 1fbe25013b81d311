//! Lexical handling of stack-relative paths.
//!
//! Every path a descriptor places inside a stack goes through
//! [`normalize_relative`] so it can never name a location outside the
//! stack root lexically. [`prepare_write`] adds the check against the
//! filesystem, where symlinks already on disk could redirect a write.

use std::path::{Component, Path, PathBuf};

use crate::error::{Result, StackError};

/// Normalizes a path that must stay inside the stack root.
///
/// `.` components are dropped and `..` components cancel the preceding
/// segment. The result may be empty, meaning the root itself.
///
/// # Errors
///
/// Returns `StackError::Config` if the path is absolute or climbs above
/// the root.
pub fn normalize_relative(path: &Path) -> Result<PathBuf> {
    let mut segments: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => segments.push(segment),
            Component::CurDir => {}
            Component::ParentDir => {
                if segments.pop().is_none() {
                    return Err(StackError::config(format!(
                        "path \"{}\" escapes the stack root",
                        path.display()
                    )));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(StackError::config(format!(
                    "path \"{}\" must be relative to the stack root",
                    path.display()
                )));
            }
        }
    }
    Ok(segments.iter().collect())
}

/// Like [`normalize_relative`], but also rejects paths naming the root.
///
/// # Errors
///
/// Returns `StackError::Config` if the path is empty, absolute or escapes
/// the root.
pub fn normalize_destination(path: &Path) -> Result<PathBuf> {
    let normalized = normalize_relative(path)?;
    if normalized.as_os_str().is_empty() {
        return Err(StackError::config(format!(
            "destination \"{}\" must name a path below the stack root",
            path.display()
        )));
    }
    Ok(normalized)
}

/// Checks that writing `root/relative` stays inside `root` once existing
/// symlinks are followed, and clears a symlink sitting at the target.
///
/// Resolves the deepest existing ancestor of the target, so it must run
/// before missing parent directories are created. Returns the target path.
///
/// # Errors
///
/// Returns `StackError::Config` if the target resolves outside `root`, or
/// `StackError::Io` if the filesystem cannot be inspected.
pub fn prepare_write(root: &Path, relative: &Path) -> Result<PathBuf> {
    let canonical_root = root.canonicalize().map_err(|e| StackError::io(root, e))?;
    let target = root.join(relative);
    if let Some(parent) = target.parent() {
        for ancestor in parent.ancestors() {
            match ancestor.canonicalize() {
                Ok(resolved) if resolved.starts_with(&canonical_root) => break,
                Ok(resolved) => {
                    return Err(StackError::config(format!(
                        "path \"{}\" resolves outside the stack root through {}",
                        relative.display(),
                        resolved.display()
                    )));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(StackError::io(ancestor, e)),
            }
        }
    }

    let is_symlink = std::fs::symlink_metadata(&target)
        .is_ok_and(|metadata| metadata.file_type().is_symlink());
    if is_symlink {
        std::fs::remove_file(&target).map_err(|e| StackError::io(&target, e))?;
    }
    Ok(target)
}
