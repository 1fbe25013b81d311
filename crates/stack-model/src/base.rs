//! Canonical base stacks.
//!
//! The official distributions come in three flavours that differ only by
//! classifier. Each archive wraps its content in one root directory, which
//! is why they are stripped by one segment.

use std::fmt;
use std::str::FromStr;

use stack_common::constants::{
    CANONICAL_BASE_GROUP, CANONICAL_BASE_NAME, CANONICAL_BASE_TYPE, STACK_VERSION,
};
use stack_common::error::{Result, StackError};
use stack_common::types::ArtifactCoordinate;

use crate::dependency::StackDependency;

/// One of the official base distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseVariant {
    /// Core runtime only.
    Min,
    /// Core runtime plus the most common modules.
    Base,
    /// Every module of the release.
    Full,
}

impl BaseVariant {
    /// All variants, smallest first.
    pub const ALL: [Self; 3] = [Self::Min, Self::Base, Self::Full];

    /// Classifier and id of this variant.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Base => "base",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for BaseVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BaseVariant {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|variant| variant.as_str() == s)
            .ok_or_else(|| {
                StackError::config(format!(
                    "unknown base stack \"{s}\": expected one of min, base, full"
                ))
            })
    }
}

/// Returns a freshly built canonical base at the current stack release.
///
/// # Errors
///
/// Never fails for the built-in constants; the `Result` is kept because
/// coordinate construction is fallible.
pub fn canonical_base(variant: BaseVariant) -> Result<StackDependency> {
    canonical_base_at(variant, STACK_VERSION)
}

/// Returns a canonical base pinned to another release.
///
/// # Errors
///
/// Returns `StackError::Config` if `version` is empty.
pub fn canonical_base_at(variant: BaseVariant, version: &str) -> Result<StackDependency> {
    let coordinate = ArtifactCoordinate::new(CANONICAL_BASE_GROUP, CANONICAL_BASE_NAME, version)?
        .with_classifier(variant.as_str())?
        .with_type(CANONICAL_BASE_TYPE)?;
    StackDependency::builder(coordinate)
        .strip(1)
        .unpack(true)
        .id(variant.as_str())
        .build()
}
