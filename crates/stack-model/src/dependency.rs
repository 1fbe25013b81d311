//! Declared stack layers.
//!
//! A [`StackDependency`] is an immutable value produced by
//! [`StackDependencyBuilder::build`], which is the single place its
//! installation hints are validated.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stack_common::error::{Result, StackError};
use stack_common::paths::normalize_relative;
use stack_common::types::{ArtifactCoordinate, Packaging};

/// Position of a layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerRole {
    /// The inherited distribution, always applied first.
    Base,
    /// An additional dependency, applied in declaration order.
    Regular,
}

impl fmt::Display for LayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => write!(f, "base"),
            Self::Regular => write!(f, "dependency"),
        }
    }
}

/// An artifact to add to a stack, with its installation hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDependency {
    coordinate: ArtifactCoordinate,
    strip: u32,
    target: PathBuf,
    unpack: bool,
    id: Option<String>,
    include: Vec<PathBuf>,
    exclude: Vec<PathBuf>,
}

impl StackDependency {
    /// Starts configuring a dependency on `coordinate`.
    #[must_use]
    pub fn builder(coordinate: ArtifactCoordinate) -> StackDependencyBuilder {
        StackDependencyBuilder::new(coordinate)
    }

    /// Returns a builder pre-filled with this dependency's settings.
    ///
    /// This is the only way to derive a customized variant; the value
    /// itself is never mutated.
    #[must_use]
    pub fn to_builder(&self) -> StackDependencyBuilder {
        StackDependencyBuilder {
            coordinate: self.coordinate.clone(),
            strip: self.strip,
            target: Some(self.target.clone()),
            unpack: Some(self.unpack),
            id: self.id.clone(),
            include: self.include.clone(),
            exclude: self.exclude.clone(),
        }
    }

    /// Artifact to resolve.
    #[must_use]
    pub const fn coordinate(&self) -> &ArtifactCoordinate {
        &self.coordinate
    }

    /// Number of leading path segments removed from archive entries.
    #[must_use]
    pub const fn strip(&self) -> u32 {
        self.strip
    }

    /// Normalized sub-path of the stack root; empty for the root itself.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Whether the artifact is extracted rather than copied.
    #[must_use]
    pub const fn unpack(&self) -> bool {
        self.unpack
    }

    /// Optional human-readable tag.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Entry path prefixes to keep; empty keeps everything.
    #[must_use]
    pub fn include(&self) -> &[PathBuf] {
        &self.include
    }

    /// Entry path prefixes to drop.
    #[must_use]
    pub fn exclude(&self) -> &[PathBuf] {
        &self.exclude
    }

    /// Label used in logs and error messages.
    #[must_use]
    pub fn label(&self) -> String {
        self.id.as_ref().map_or_else(
            || self.coordinate.to_string(),
            |id| format!("{id} ({})", self.coordinate),
        )
    }
}

/// Fluent builder for [`StackDependency`].
#[derive(Debug, Clone)]
pub struct StackDependencyBuilder {
    coordinate: ArtifactCoordinate,
    strip: u32,
    target: Option<PathBuf>,
    unpack: Option<bool>,
    id: Option<String>,
    include: Vec<PathBuf>,
    exclude: Vec<PathBuf>,
}

impl StackDependencyBuilder {
    /// Creates a builder for `coordinate` with default hints.
    #[must_use]
    pub const fn new(coordinate: ArtifactCoordinate) -> Self {
        Self {
            coordinate,
            strip: 0,
            target: None,
            unpack: None,
            id: None,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    /// Replaces the coordinate, keeping every other hint.
    #[must_use]
    pub fn coordinate(mut self, coordinate: ArtifactCoordinate) -> Self {
        self.coordinate = coordinate;
        self
    }

    /// Sets the number of leading path segments to strip.
    #[must_use]
    pub const fn strip(mut self, strip: u32) -> Self {
        self.strip = strip;
        self
    }

    /// Sets the sub-path of the stack root the layer is placed in.
    #[must_use]
    pub fn target(mut self, target: impl Into<PathBuf>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Sets whether the artifact is extracted. Defaults to `true` for
    /// archive types and `false` otherwise.
    #[must_use]
    pub const fn unpack(mut self, unpack: bool) -> Self {
        self.unpack = Some(unpack);
        self
    }

    /// Sets the human-readable tag.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds an entry path prefix to keep.
    #[must_use]
    pub fn include(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.include.push(prefix.into());
        self
    }

    /// Adds an entry path prefix to drop.
    #[must_use]
    pub fn exclude(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.exclude.push(prefix.into());
        self
    }

    /// Validates the configuration and freezes it.
    ///
    /// # Errors
    ///
    /// Returns `StackError::Config` if the target or a filter escapes the
    /// stack root, a filter is empty, or the id is blank.
    pub fn build(self) -> Result<StackDependency> {
        let target = match &self.target {
            Some(target) => normalize_relative(target)?,
            None => PathBuf::new(),
        };
        if self.id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(StackError::config(format!(
                "dependency {} has an empty id",
                self.coordinate
            )));
        }
        let include = normalize_filters(&self.include)?;
        let exclude = normalize_filters(&self.exclude)?;
        let unpack = self
            .unpack
            .unwrap_or(self.coordinate.packaging() == Packaging::Archive);

        Ok(StackDependency {
            coordinate: self.coordinate,
            strip: self.strip,
            target,
            unpack,
            id: self.id,
            include,
            exclude,
        })
    }
}

fn normalize_filters(filters: &[PathBuf]) -> Result<Vec<PathBuf>> {
    filters
        .iter()
        .map(|filter| {
            let normalized = normalize_relative(filter)?;
            if normalized.as_os_str().is_empty() {
                return Err(StackError::config(format!(
                    "filter \"{}\" must name a path",
                    filter.display()
                )));
            }
            Ok(normalized)
        })
        .collect()
}
