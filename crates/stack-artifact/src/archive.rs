//! Archive extraction with leading-path stripping.
//!
//! Every entry name is reduced to its normal segments, the first `strip`
//! of them are removed, and the remainder is written below the
//! destination. Entries left with nothing after stripping are dropped, as
//! are entries whose name contains `..` and symlinks pointing outside the
//! destination. Before each write the target's existing parent is resolved
//! on disk, so a symlink already in place cannot redirect it either.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use stack_common::error::{ExtractionErrorKind, Result, StackError};
use stack_common::paths::{normalize_relative, prepare_write};

/// Supported archive encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Zip, including `jar`/`war`/`ear`.
    Zip,
    /// Uncompressed tar.
    Tar,
    /// Gzip-compressed tar.
    TarGz,
}

impl ArchiveFormat {
    /// Maps an artifact type to its archive format.
    #[must_use]
    pub fn from_type(kind: &str) -> Option<Self> {
        match kind.to_ascii_lowercase().as_str() {
            "zip" | "jar" | "war" | "ear" => Some(Self::Zip),
            "tar" => Some(Self::Tar),
            "tar.gz" | "tgz" => Some(Self::TarGz),
            _ => None,
        }
    }

    /// Guesses the format from a file name.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else {
            Self::from_type(name.rsplit('.').next()?)
        }
    }
}

/// Options for one extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Leading path segments removed from every entry.
    pub strip: u32,
    /// Archive encoding; guessed from the file name when `None`.
    pub format: Option<ArchiveFormat>,
    /// Stripped-path prefixes to keep; empty keeps everything.
    pub include: Vec<PathBuf>,
    /// Stripped-path prefixes to drop. Wins over `include`.
    pub exclude: Vec<PathBuf>,
}

impl ExtractOptions {
    /// Options that only strip.
    #[must_use]
    pub const fn strip(strip: u32) -> Self {
        Self {
            strip,
            format: None,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    /// Maps an archive entry name to its output path, or `None` to drop it.
    #[must_use]
    pub fn select(&self, entry: &Path) -> Option<PathBuf> {
        let relative = strip_entry_path(entry, self.strip)?;
        if self.exclude.iter().any(|prefix| relative.starts_with(prefix)) {
            return None;
        }
        if !self.include.is_empty() && !self.include.iter().any(|p| relative.starts_with(p)) {
            return None;
        }
        Some(relative)
    }
}

/// Removes `strip` leading segments from an archive entry name.
///
/// Returns `None` when the entry has no more than `strip` segments or
/// names a parent directory.
#[must_use]
pub fn strip_entry_path(entry: &Path, strip: u32) -> Option<PathBuf> {
    let mut segments = Vec::new();
    for component in entry.components() {
        match component {
            Component::Normal(segment) => segments.push(segment),
            Component::ParentDir => return None,
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    let strip = usize::try_from(strip).unwrap_or(usize::MAX);
    if segments.len() <= strip {
        return None;
    }
    Some(segments[strip..].iter().collect())
}

/// Extracts archives into a directory.
pub trait ArchiveExtractor: Send + Sync {
    /// Extracts `archive` below `dest`, returning the files written
    /// relative to `dest`.
    ///
    /// # Errors
    ///
    /// Returns `StackError::Extraction` if the archive is corrupt or an
    /// entry cannot be written.
    fn extract(&self, archive: &Path, dest: &Path, options: &ExtractOptions) -> Result<Vec<PathBuf>>;
}

/// Extractor for zip, tar and gzip-compressed tar archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unpacker;

impl ArchiveExtractor for Unpacker {
    fn extract(&self, archive: &Path, dest: &Path, options: &ExtractOptions) -> Result<Vec<PathBuf>> {
        tracing::info!(
            archive = %archive.display(),
            target = %dest.display(),
            strip = options.strip,
            "extracting archive"
        );

        let format = options
            .format
            .or_else(|| ArchiveFormat::from_path(archive))
            .ok_or_else(|| {
                extraction_error(archive, ExtractionErrorKind::CorruptArchive, "unsupported archive format")
            })?;

        std::fs::create_dir_all(dest)
            .map_err(|e| extraction_error(archive, ExtractionErrorKind::Io, e))?;
        let file = File::open(archive)
            .map_err(|e| extraction_error(archive, ExtractionErrorKind::Io, e))?;

        let written = match format {
            ArchiveFormat::Zip => extract_zip(file, archive, dest, options)?,
            ArchiveFormat::Tar => extract_tar(BufReader::new(file), archive, dest, options)?,
            ArchiveFormat::TarGz => {
                let decoder = flate2::read::GzDecoder::new(BufReader::new(file));
                extract_tar(decoder, archive, dest, options)?
            }
        };

        tracing::info!(files = written.len(), "archive extracted");
        Ok(written)
    }
}

fn extract_tar<R: Read>(
    reader: R,
    archive_path: &Path,
    dest: &Path,
    options: &ExtractOptions,
) -> Result<Vec<PathBuf>> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    let entries = archive
        .entries()
        .map_err(|e| extraction_error(archive_path, ExtractionErrorKind::CorruptArchive, e))?;

    let mut written = Vec::new();
    for entry in entries {
        let mut entry =
            entry.map_err(|e| extraction_error(archive_path, ExtractionErrorKind::CorruptArchive, e))?;
        let name = entry
            .path()
            .map_err(|e| extraction_error(archive_path, ExtractionErrorKind::CorruptArchive, e))?
            .into_owned();
        let Some(relative) = options.select(&name) else {
            tracing::debug!(entry = %name.display(), "dropping archive entry");
            continue;
        };
        let entry_type = entry.header().entry_type();
        if entry_type.is_symlink() && !symlink_stays_inside(&entry, &relative, archive_path)? {
            tracing::warn!(entry = %name.display(), "dropping symlink pointing outside the destination");
            continue;
        }
        let target = contained_target(dest, &relative, archive_path)?;
        create_parent(&target, archive_path)?;

        if entry_type.is_hard_link() {
            copy_hard_link(&entry, archive_path, dest, &target, options)?;
        } else {
            let _ = entry.unpack(&target).map_err(|e| classify(archive_path, &e))?;
        }
        if !entry_type.is_dir() {
            written.push(relative);
        }
    }
    Ok(written)
}

/// Symlink entries may only point at a location inside the destination.
fn symlink_stays_inside<R: Read>(
    entry: &tar::Entry<'_, R>,
    relative: &Path,
    archive_path: &Path,
) -> Result<bool> {
    let link = entry
        .link_name()
        .map_err(|e| extraction_error(archive_path, ExtractionErrorKind::CorruptArchive, e))?
        .ok_or_else(|| {
            extraction_error(archive_path, ExtractionErrorKind::CorruptArchive, "symlink without target")
        })?;
    if link.is_absolute() {
        return Ok(false);
    }
    let location = relative.parent().unwrap_or_else(|| Path::new(""));
    Ok(normalize_relative(&location.join(&link)).is_ok())
}

/// Hard links point at an earlier entry by its archive name, which has to
/// be stripped like every other name.
fn copy_hard_link<R: Read>(
    entry: &tar::Entry<'_, R>,
    archive_path: &Path,
    dest: &Path,
    target: &Path,
    options: &ExtractOptions,
) -> Result<()> {
    let link = entry
        .link_name()
        .map_err(|e| extraction_error(archive_path, ExtractionErrorKind::CorruptArchive, e))?
        .ok_or_else(|| {
            extraction_error(archive_path, ExtractionErrorKind::CorruptArchive, "hard link without target")
        })?;
    let linked = strip_entry_path(&link, options.strip).ok_or_else(|| {
        extraction_error(
            archive_path,
            ExtractionErrorKind::CorruptArchive,
            format!("hard link to dropped entry {}", link.display()),
        )
    })?;
    let _ = std::fs::copy(dest.join(linked), target)
        .map_err(|e| extraction_error(archive_path, ExtractionErrorKind::Io, e))?;
    Ok(())
}

fn extract_zip(
    file: File,
    archive_path: &Path,
    dest: &Path,
    options: &ExtractOptions,
) -> Result<Vec<PathBuf>> {
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|e| extraction_error(archive_path, ExtractionErrorKind::CorruptArchive, e))?;

    let mut written = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| extraction_error(archive_path, ExtractionErrorKind::CorruptArchive, e))?;
        let Some(name) = entry.enclosed_name().map(|n| n.to_path_buf()) else {
            tracing::warn!(entry = entry.name(), "dropping unsafe zip entry");
            continue;
        };
        let Some(relative) = options.select(&name) else {
            tracing::debug!(entry = %name.display(), "dropping archive entry");
            continue;
        };
        let target = contained_target(dest, &relative, archive_path)?;

        if entry.is_dir() {
            std::fs::create_dir_all(&target)
                .map_err(|e| extraction_error(archive_path, ExtractionErrorKind::Io, e))?;
            continue;
        }

        create_parent(&target, archive_path)?;
        let mut out = File::create(&target)
            .map_err(|e| extraction_error(archive_path, ExtractionErrorKind::Io, e))?;
        let _ = std::io::copy(&mut entry, &mut out).map_err(|e| classify(archive_path, &e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&target, std::fs::Permissions::from_mode(mode & 0o7777))
                .map_err(|e| extraction_error(archive_path, ExtractionErrorKind::Io, e))?;
        }

        written.push(relative);
    }
    Ok(written)
}

fn contained_target(dest: &Path, relative: &Path, archive_path: &Path) -> Result<PathBuf> {
    prepare_write(dest, relative).map_err(|e| extraction_error(archive_path, ExtractionErrorKind::Io, e))
}

fn create_parent(target: &Path, archive_path: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| extraction_error(archive_path, ExtractionErrorKind::Io, e))?;
    }
    Ok(())
}

/// Read errors surfacing while copying entry data mean a damaged archive;
/// anything else is a write failure.
fn classify(archive_path: &Path, error: &std::io::Error) -> StackError {
    let kind = match error.kind() {
        std::io::ErrorKind::InvalidData
        | std::io::ErrorKind::InvalidInput
        | std::io::ErrorKind::UnexpectedEof => ExtractionErrorKind::CorruptArchive,
        _ => ExtractionErrorKind::Io,
    };
    extraction_error(archive_path, kind, error)
}

fn extraction_error(
    archive: &Path,
    kind: ExtractionErrorKind,
    message: impl std::fmt::Display,
) -> StackError {
    StackError::Extraction {
        archive: archive.to_path_buf(),
        kind,
        message: message.to_string(),
    }
}
