//! Unified error taxonomy for the stack builder workspace.
//!
//! Every failure the composition engine can surface maps onto one of the
//! variants below. The engine wraps them with the build stage and the
//! layer in progress (see `stack_engine::error::BuildError`).

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Why an artifact could not be resolved to a local file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionErrorKind {
    /// No repository knows the coordinate.
    NotFound,
    /// The artifact content does not match its published checksum.
    ChecksumMismatch,
    /// The transport failed (or the network is disabled).
    NetworkFailure,
}

impl fmt::Display for ResolutionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
            Self::NetworkFailure => write!(f, "network failure"),
        }
    }
}

/// Why an archive could not be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionErrorKind {
    /// The archive is truncated, malformed, or of an unknown format.
    CorruptArchive,
    /// Writing an entry to the stack directory failed.
    Io,
}

impl fmt::Display for ExtractionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CorruptArchive => write!(f, "corrupt archive"),
            Self::Io => write!(f, "I/O failure"),
        }
    }
}

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StackError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// An artifact coordinate could not be turned into a local file.
    #[error("cannot resolve {coordinate}: {kind}: {message}")]
    Resolution {
        /// Display form of the offending coordinate.
        coordinate: String,
        /// Failure category.
        kind: ResolutionErrorKind,
        /// Human-readable cause.
        message: String,
    },

    /// An archive could not be extracted into the stack.
    #[error("cannot extract {archive}: {kind}: {message}")]
    Extraction {
        /// Archive being extracted.
        archive: PathBuf,
        /// Failure category.
        kind: ExtractionErrorKind,
        /// Human-readable cause.
        message: String,
    },

    /// The stack content was written but the manifest could not be.
    #[error("cannot persist manifest {path}: {source}")]
    ManifestPersist {
        /// Manifest location.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The build was cancelled between two layer applications.
    #[error("build cancelled")]
    Cancelled,

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl StackError {
    /// Shorthand for [`StackError::Io`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for [`StackError::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Shorthand for [`StackError::Resolution`].
    pub fn resolution(
        coordinate: impl fmt::Display,
        kind: ResolutionErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Resolution {
            coordinate: coordinate.to_string(),
            kind,
            message: message.into(),
        }
    }

    /// Returns the resolution failure category, if this is a resolution error.
    #[must_use]
    pub const fn resolution_kind(&self) -> Option<ResolutionErrorKind> {
        match self {
            Self::Resolution { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StackError>;
