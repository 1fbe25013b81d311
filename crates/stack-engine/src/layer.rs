//! Placing one resolved layer into the stack.

use std::path::{Path, PathBuf};

use stack_artifact::archive::{ArchiveExtractor, ArchiveFormat, ExtractOptions};
use stack_artifact::resolver::{ArtifactResolver, ResolvedArtifact};
use stack_common::error::{Result, StackError};
use stack_model::dependency::StackDependency;

/// Resolves the artifact of `dependency` to a local file.
///
/// # Errors
///
/// Returns `StackError::Resolution` when the resolver fails; a layer is
/// never silently skipped.
pub fn resolve_local_file(
    resolver: &dyn ArtifactResolver,
    dependency: &StackDependency,
) -> Result<ResolvedArtifact> {
    let coordinate = dependency.coordinate();
    tracing::debug!(coordinate = %coordinate, resolver = resolver.name(), "resolving");
    resolver.resolve(coordinate)
}

/// Extracts or copies `resolved` into `stack_root` according to the
/// dependency's hints.
///
/// Returns the files written, relative to `stack_root`.
///
/// # Errors
///
/// Returns `StackError::Extraction` if unpacking fails, or
/// `StackError::Io` if a single file cannot be copied.
pub fn materialize(
    extractor: &dyn ArchiveExtractor,
    stack_root: &Path,
    dependency: &StackDependency,
    resolved: &ResolvedArtifact,
) -> Result<Vec<PathBuf>> {
    let target = stack_root.join(dependency.target());
    let coordinate = dependency.coordinate();

    if dependency.unpack() {
        let options = ExtractOptions {
            strip: dependency.strip(),
            format: ArchiveFormat::from_type(coordinate.kind()),
            include: dependency.include().to_vec(),
            exclude: dependency.exclude().to_vec(),
        };
        let written = extractor.extract(&resolved.path, &target, &options)?;
        return Ok(written
            .into_iter()
            .map(|path| dependency.target().join(path))
            .collect());
    }

    std::fs::create_dir_all(&target).map_err(|e| StackError::io(&target, e))?;
    let file_name = coordinate.file_name();
    let destination = target.join(&file_name);
    tracing::debug!(
        source = %resolved.path.display(),
        destination = %destination.display(),
        "copying artifact"
    );
    let _ = std::fs::copy(&resolved.path, &destination)
        .map_err(|e| StackError::io(&destination, e))?;
    Ok(vec![dependency.target().join(file_name)])
}
