//! SHA-256 content verification.
//!
//! Fingerprints resolved artifacts and validates them against published
//! `.sha256` sidecar files.

use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use stack_common::constants::CHECKSUM_EXTENSION;
use stack_common::error::{Result, StackError};
use stack_common::types::Sha256Hash;

/// Computes the SHA-256 hash of a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn hash_file(path: &Path) -> Result<Sha256Hash> {
    tracing::debug!(path = %path.display(), "computing SHA-256 hash");
    let mut file = std::fs::File::open(path).map_err(|e| StackError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer).map_err(|e| StackError::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Sha256Hash::from_hex(format!("{:x}", hasher.finalize()))
}

/// Computes the SHA-256 hash of an in-memory buffer.
///
/// # Errors
///
/// Only fails if the digest is not valid hex, which SHA-256 never produces.
pub fn hash_bytes(bytes: &[u8]) -> Result<Sha256Hash> {
    Sha256Hash::from_hex(format!("{:x}", Sha256::digest(bytes)))
}

/// Returns the sidecar path holding the published checksum of `path`.
#[must_use]
pub fn checksum_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(CHECKSUM_EXTENSION);
    PathBuf::from(name)
}

/// Parses checksum sidecar content: a hex digest, optionally followed by
/// a file name as written by `sha256sum`.
///
/// # Errors
///
/// Returns `StackError::Config` if no valid digest is present.
pub fn parse_checksum(content: &str) -> Result<Sha256Hash> {
    let digest = content.split_whitespace().next().unwrap_or_default();
    Sha256Hash::from_hex(digest)
}

/// Reads the published checksum of `path`, if a sidecar exists.
///
/// # Errors
///
/// Returns an error if the sidecar exists but is unreadable or malformed.
pub fn read_checksum(path: &Path) -> Result<Option<Sha256Hash>> {
    let sidecar = checksum_path(path);
    if !sidecar.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&sidecar).map_err(|e| StackError::io(&sidecar, e))?;
    parse_checksum(&content).map(Some)
}
