//! Loose files copied into the stack after every layer.

use std::path::{Path, PathBuf};

use stack_common::error::{Result, StackError};
use stack_common::paths::{normalize_destination, prepare_write};
use walkdir::WalkDir;

/// A file or directory copied verbatim to a path below the stack root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalFile {
    source: PathBuf,
    destination: PathBuf,
}

impl AdditionalFile {
    /// Declares a copy of `source` to `destination` (relative to the root).
    ///
    /// # Errors
    ///
    /// Returns `StackError::Config` if `destination` is empty, absolute or
    /// escapes the stack root.
    pub fn new(source: impl Into<PathBuf>, destination: impl AsRef<Path>) -> Result<Self> {
        let destination = normalize_destination(destination.as_ref())?;
        Ok(Self {
            source: source.into(),
            destination,
        })
    }

    /// Path on the building machine.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Normalized destination relative to the stack root.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Copies the source into `stack_root`, overwriting what is there.
    ///
    /// Directories are copied recursively. Returns the written files,
    /// relative to `stack_root`.
    ///
    /// # Errors
    ///
    /// Returns `StackError::Io` if the source does not exist or a copy fails,
    /// and `StackError::Config` if a symlink already in the stack would
    /// carry the copy outside it.
    pub fn apply(&self, stack_root: &Path) -> Result<Vec<PathBuf>> {
        let metadata =
            std::fs::metadata(&self.source).map_err(|e| StackError::io(&self.source, e))?;
        tracing::debug!(
            source = %self.source.display(),
            destination = %self.destination.display(),
            "copying additional file"
        );

        std::fs::create_dir_all(stack_root).map_err(|e| StackError::io(stack_root, e))?;

        if !metadata.is_dir() {
            copy_file(&self.source, stack_root, &self.destination)?;
            return Ok(vec![self.destination.clone()]);
        }

        let mut written = Vec::new();
        for entry in WalkDir::new(&self.source).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.source).to_path_buf();
                StackError::io(path, e.into())
            })?;
            if entry.file_type().is_dir() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.source)
                .map_err(|_| StackError::config("walked outside the copied directory"))?;
            let destination = self.destination.join(relative);
            copy_file(entry.path(), stack_root, &destination)?;
            written.push(destination);
        }
        Ok(written)
    }
}

fn copy_file(source: &Path, stack_root: &Path, destination: &Path) -> Result<()> {
    let target = prepare_write(stack_root, destination)?;
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StackError::io(parent, e))?;
    }
    let _ = std::fs::copy(source, &target).map_err(|e| StackError::io(&target, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_traversal_destination() {
        let result = AdditionalFile::new("config/app.conf", "../../etc/passwd");
        assert!(matches!(result, Err(StackError::Config { .. })));
    }

    #[test]
    fn new_rejects_absolute_destination() {
        assert!(AdditionalFile::new("config/app.conf", "/etc/passwd").is_err());
    }

    #[test]
    fn apply_copies_file_and_creates_parents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("app.conf");
        std::fs::write(&source, b"port=8080").expect("write");
        let root = dir.path().join("stack");

        let file = AdditionalFile::new(&source, "conf/app.conf").expect("valid");
        let written = file.apply(&root).expect("apply");

        assert_eq!(written, vec![PathBuf::from("conf/app.conf")]);
        let content = std::fs::read(root.join("conf/app.conf")).expect("read");
        assert_eq!(content, b"port=8080");
    }

    #[test]
    fn apply_overwrites_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("app.conf");
        std::fs::write(&source, b"new").expect("write");
        let root = dir.path().join("stack");
        std::fs::create_dir_all(root.join("conf")).expect("mkdir");
        std::fs::write(root.join("conf/app.conf"), b"old").expect("write");

        let _ = AdditionalFile::new(&source, "conf/app.conf")
            .expect("valid")
            .apply(&root)
            .expect("apply");
        let content = std::fs::read_to_string(root.join("conf/app.conf")).expect("read");
        assert_eq!(content, "new");
    }

    #[test]
    fn apply_copies_directories_recursively() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("scripts");
        std::fs::create_dir_all(source.join("nested")).expect("mkdir");
        std::fs::write(source.join("start.sh"), b"#!/bin/sh").expect("write");
        std::fs::write(source.join("nested/env.sh"), b"export A=1").expect("write");
        let root = dir.path().join("stack");

        let written = AdditionalFile::new(&source, "bin")
            .expect("valid")
            .apply(&root)
            .expect("apply");

        assert_eq!(written.len(), 2);
        assert!(root.join("bin/start.sh").is_file());
        assert!(root.join("bin/nested/env.sh").is_file());
    }

    #[test]
    fn apply_missing_source_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = AdditionalFile::new(dir.path().join("missing"), "conf/x").expect("valid");
        let result = file.apply(&dir.path().join("stack"));
        assert!(matches!(result, Err(StackError::Io { .. })));
        assert!(!dir.path().join("stack/conf/x").exists());
    }

    #[cfg(unix)]
    #[test]
    fn apply_refuses_copy_through_outward_symlink() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("app.conf");
        std::fs::write(&source, b"port=8080").expect("write");
        let outside = dir.path().join("outside");
        let root = dir.path().join("stack");
        std::fs::create_dir_all(&outside).expect("mkdir outside");
        std::fs::create_dir_all(&root).expect("mkdir root");
        std::os::unix::fs::symlink(&outside, root.join("conf")).expect("symlink");

        let file = AdditionalFile::new(&source, "conf/app.conf").expect("valid");
        let result = file.apply(&root);

        assert!(matches!(result, Err(StackError::Config { .. })));
        assert!(!outside.join("app.conf").exists());
    }
}
