//! Stack descriptor loading.
//!
//! Reads a JSON or YAML description into a validated [`StackDescriptor`].
//! Unknown keys are rejected, relative paths are resolved against the
//! descriptor's own directory, and semantic checks run before the
//! descriptor is handed to the engine.
//!
//! ```json
//! {
//!   "directory": "target/stack",
//!   "from": "min",
//!   "dependencies": [
//!     { "groupId": "com.example", "artifactId": "widgets", "version": "1.0",
//!       "type": "zip", "target": "ext/widgets" }
//!   ],
//!   "files": [ { "source": "config/app.conf", "destination": "conf/app.conf" } ]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use stack_common::constants::CANONICAL_BASE_TYPE;
use stack_common::error::{Result, StackError};
use stack_common::types::ArtifactCoordinate;

use crate::base::{BaseVariant, canonical_base, canonical_base_at};
use crate::dependency::{StackDependency, StackDependencyBuilder};
use crate::descriptor::StackDescriptor;
use crate::file::AdditionalFile;

/// Serialization format of a descriptor file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorFormat {
    /// `.json` files.
    Json,
    /// `.yaml` and `.yml` files.
    Yaml,
}

impl DescriptorFormat {
    /// Picks the format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns `StackError::Config` for any other extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(StackError::config(format!(
                "unsupported descriptor {}: expected a .json, .yaml or .yml file",
                path.display()
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDescriptor {
    directory: Option<PathBuf>,
    from: Option<RawBase>,
    #[serde(default)]
    dependencies: Vec<RawDependency>,
    #[serde(default)]
    files: Vec<RawFile>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBase {
    Variant(String),
    Reference(RawBaseRef),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawBaseRef {
    id: Option<String>,
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<String>,
    classifier: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    strip: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawDependency {
    group_id: String,
    artifact_id: String,
    version: String,
    classifier: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    unpack: Option<bool>,
    strip: Option<i64>,
    target: Option<PathBuf>,
    id: Option<String>,
    #[serde(default)]
    include: Vec<PathBuf>,
    #[serde(default)]
    exclude: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFile {
    source: PathBuf,
    destination: PathBuf,
}

/// Loads and validates the descriptor at `path`.
///
/// `directory` overrides the descriptor's own `directory` key.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is malformed, declares an
/// invalid value, or names no output directory.
pub fn load_descriptor(path: &Path, directory: Option<&Path>) -> Result<StackDescriptor> {
    tracing::info!(path = %path.display(), "loading stack descriptor");
    let format = DescriptorFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| StackError::io(path, e))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut descriptor = parse_descriptor(&content, format, base_dir, directory)
        .map_err(|e| match e {
            StackError::Config { message } => {
                StackError::config(format!("{}: {message}", path.display()))
            }
            other => other,
        })?;
    descriptor.descriptor = Some(path.to_path_buf());
    Ok(descriptor)
}

/// Parses descriptor text. Relative paths resolve against `base_dir`.
///
/// # Errors
///
/// Returns `StackError::Config` if the text is malformed or invalid.
pub fn parse_descriptor(
    content: &str,
    format: DescriptorFormat,
    base_dir: &Path,
    directory: Option<&Path>,
) -> Result<StackDescriptor> {
    let raw: RawDescriptor = match format {
        DescriptorFormat::Json => serde_json::from_str(content)
            .map_err(|e| StackError::config(format!("malformed descriptor: {e}")))?,
        DescriptorFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| StackError::config(format!("malformed descriptor: {e}")))?,
    };

    let directory = directory
        .map(Path::to_path_buf)
        .or_else(|| raw.directory.map(|d| base_dir.join(d)))
        .ok_or_else(|| StackError::config("no output directory: set \"directory\" or pass one"))?;

    let mut descriptor = StackDescriptor::new(directory)?;
    if let Some(from) = raw.from {
        descriptor.base = Some(convert_base(from)?);
    }
    for dependency in raw.dependencies {
        descriptor.dependencies.push(convert_dependency(dependency)?);
    }
    for file in raw.files {
        let source = base_dir.join(&file.source);
        descriptor.files.push(AdditionalFile::new(source, &file.destination)?);
    }

    crate::validator::validate(&descriptor)?;
    tracing::debug!(
        layers = descriptor.layers().count(),
        files = descriptor.files.len(),
        "descriptor parsed"
    );
    Ok(descriptor)
}

fn convert_base(raw: RawBase) -> Result<StackDependency> {
    let reference = match raw {
        RawBase::Variant(name) => return canonical_base(name.parse()?),
        RawBase::Reference(reference) => reference,
    };

    let builder = match (&reference.group_id, &reference.artifact_id) {
        (None, None) => {
            let variant: BaseVariant = reference
                .id
                .as_deref()
                .ok_or_else(|| {
                    StackError::config("base stack needs either an id or groupId/artifactId")
                })?
                .parse()?;
            let canonical = match &reference.version {
                Some(version) => canonical_base_at(variant, version)?,
                None => canonical_base(variant)?,
            };
            if reference.classifier.is_some() || reference.kind.is_some() {
                return Err(StackError::config(format!(
                    "base stack \"{variant}\" is canonical: classifier and type cannot be overridden"
                )));
            }
            canonical.to_builder()
        }
        (Some(group), Some(name)) => {
            let version = reference.version.as_deref().ok_or_else(|| {
                StackError::config(format!("base stack {group}:{name} has no version"))
            })?;
            let coordinate = coordinate(
                group,
                name,
                version,
                reference.classifier.as_deref(),
                Some(reference.kind.as_deref().unwrap_or(CANONICAL_BASE_TYPE)),
            )?;
            let builder = StackDependency::builder(coordinate).unpack(true);
            match &reference.id {
                Some(id) => builder.id(id.clone()),
                None => builder,
            }
        }
        _ => {
            return Err(StackError::config(
                "base stack needs both groupId and artifactId",
            ));
        }
    };

    with_strip(builder, reference.strip, "base stack")?.build()
}

fn convert_dependency(raw: RawDependency) -> Result<StackDependency> {
    let coordinate = coordinate(
        &raw.group_id,
        &raw.artifact_id,
        &raw.version,
        raw.classifier.as_deref(),
        raw.kind.as_deref(),
    )?;
    let label = coordinate.to_string();
    let mut builder = StackDependency::builder(coordinate);
    if let Some(unpack) = raw.unpack {
        builder = builder.unpack(unpack);
    }
    if let Some(target) = raw.target {
        builder = builder.target(target);
    }
    if let Some(id) = raw.id {
        builder = builder.id(id);
    }
    for prefix in raw.include {
        builder = builder.include(prefix);
    }
    for prefix in raw.exclude {
        builder = builder.exclude(prefix);
    }
    with_strip(builder, raw.strip, &label)?.build()
}

fn coordinate(
    group: &str,
    name: &str,
    version: &str,
    classifier: Option<&str>,
    kind: Option<&str>,
) -> Result<ArtifactCoordinate> {
    let mut coordinate = ArtifactCoordinate::new(group, name, version)?;
    if let Some(classifier) = classifier {
        coordinate = coordinate.with_classifier(classifier)?;
    }
    if let Some(kind) = kind {
        coordinate = coordinate.with_type(kind)?;
    }
    Ok(coordinate)
}

fn with_strip(
    builder: StackDependencyBuilder,
    strip: Option<i64>,
    label: &str,
) -> Result<StackDependencyBuilder> {
    match strip {
        None => Ok(builder),
        Some(strip) => u32::try_from(strip).map(|s| builder.strip(s)).map_err(|_| {
            StackError::config(format!(
                "invalid strip factor {strip} for {label}: it must be positive"
            ))
        }),
    }
}
