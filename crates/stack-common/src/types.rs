//! Domain primitive types used across the stack builder workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StackError};

/// How a resolved artifact is placed into a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Packaging {
    /// An archive whose entries are extracted.
    Archive,
    /// A single file copied verbatim.
    SingleFile,
}

impl fmt::Display for Packaging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Archive => write!(f, "archive"),
            Self::SingleFile => write!(f, "single-file"),
        }
    }
}

/// Artifact types that are archives.
const ARCHIVE_TYPES: &[&str] = &["zip", "tar", "tar.gz", "tgz"];

/// Immutable identity of a fetchable artifact.
///
/// Two coordinates are equal when group, name, version, classifier and
/// type are all equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactCoordinate {
    group: String,
    name: String,
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    classifier: Option<String>,
    #[serde(rename = "type")]
    kind: String,
}

impl ArtifactCoordinate {
    /// Creates a coordinate of the default dependency type (`jar`).
    ///
    /// # Errors
    ///
    /// Returns `StackError::Config` if group, name or version is empty.
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            group: non_empty("group", group.into())?,
            name: non_empty("name", name.into())?,
            version: non_empty("version", version.into())?,
            classifier: None,
            kind: crate::constants::DEFAULT_DEPENDENCY_TYPE.to_string(),
        })
    }

    /// Returns a copy of this coordinate with the given classifier.
    ///
    /// # Errors
    ///
    /// Returns `StackError::Config` if the classifier is empty.
    pub fn with_classifier(self, classifier: impl Into<String>) -> Result<Self> {
        Ok(Self {
            classifier: Some(non_empty("classifier", classifier.into())?),
            ..self
        })
    }

    /// Returns a copy of this coordinate with the given artifact type.
    ///
    /// # Errors
    ///
    /// Returns `StackError::Config` if the type is empty.
    pub fn with_type(self, kind: impl Into<String>) -> Result<Self> {
        Ok(Self {
            kind: non_empty("type", kind.into())?.to_ascii_lowercase(),
            ..self
        })
    }

    /// Returns a copy of this coordinate pinned to another version.
    ///
    /// # Errors
    ///
    /// Returns `StackError::Config` if the version is empty.
    pub fn with_version(self, version: impl Into<String>) -> Result<Self> {
        Ok(Self {
            version: non_empty("version", version.into())?,
            ..self
        })
    }

    /// Group identifier.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Artifact name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Opaque version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Optional classifier.
    #[must_use]
    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    /// Artifact type, doubling as the file extension.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Whether this artifact is extracted or copied.
    #[must_use]
    pub fn packaging(&self) -> Packaging {
        if ARCHIVE_TYPES.contains(&self.kind.as_str()) {
            Packaging::Archive
        } else {
            Packaging::SingleFile
        }
    }

    /// Version-less identity: `group:name[:classifier]@type`.
    ///
    /// Two versions of the same artifact share a key, which is how a later
    /// build recognises a version change.
    #[must_use]
    pub fn key(&self) -> String {
        self.classifier.as_ref().map_or_else(
            || format!("{}:{}@{}", self.group, self.name, self.kind),
            |c| format!("{}:{}:{c}@{}", self.group, self.name, self.kind),
        )
    }

    /// Conventional file name: `name-version[-classifier].type`.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.classifier.as_ref().map_or_else(
            || format!("{}-{}.{}", self.name, self.version, self.kind),
            |c| format!("{}-{}-{c}.{}", self.name, self.version, self.kind),
        )
    }
}

fn non_empty(field: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(StackError::config(format!(
            "artifact {field} must not be empty"
        )));
    }
    Ok(value)
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        write!(f, "@{}", self.kind)
    }
}

impl FromStr for ArtifactCoordinate {
    type Err = StackError;

    /// Parses `group:name:version[:classifier][@type]`.
    fn from_str(s: &str) -> Result<Self> {
        let (gav, kind) = match s.split_once('@') {
            Some((gav, kind)) => (gav, Some(kind)),
            None => (s, None),
        };
        let parts: Vec<&str> = gav.split(':').collect();
        let coordinate = match parts.as_slice() {
            [group, name, version] => Self::new(*group, *name, *version)?,
            [group, name, version, classifier] => {
                Self::new(*group, *name, *version)?.with_classifier(*classifier)?
            }
            _ => {
                return Err(StackError::config(format!(
                    "invalid artifact coordinate \"{s}\": expected group:name:version[:classifier][@type]"
                )));
            }
        };
        match kind {
            Some(kind) => coordinate.with_type(kind),
            None => Ok(coordinate),
        }
    }
}

/// SHA-256 hash digest used to fingerprint resolved artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sha256Hash(String);

impl Sha256Hash {
    /// Creates a hash from a hex-encoded string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid 64-character hex string.
    pub fn from_hex(hex: impl Into<String>) -> Result<Self> {
        let hex = hex.into().trim().to_ascii_lowercase();
        if hex.len() != crate::constants::SHA256_HEX_LENGTH
            || !hex.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(StackError::config(format!(
                "invalid SHA-256 hex string: {hex}"
            )));
        }
        Ok(Self(hex))
    }

    /// Returns the hex-encoded hash string.
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.0)
    }
}
