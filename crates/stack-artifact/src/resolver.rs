//! The artifact resolution contract and resolver chaining.

use std::path::PathBuf;

use stack_common::error::{ResolutionErrorKind, Result, StackError};
use stack_common::types::{ArtifactCoordinate, Sha256Hash};

/// A coordinate resolved to a readable local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    /// Local file holding the artifact content.
    pub path: PathBuf,
    /// Content fingerprint, when the resolver can provide one.
    pub fingerprint: Option<Sha256Hash>,
}

/// Turns coordinates into local files.
///
/// Implementations must be shareable across the resolution workers.
pub trait ArtifactResolver: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Resolves a coordinate to a local file.
    ///
    /// # Errors
    ///
    /// Returns `StackError::Resolution` with kind `NotFound`,
    /// `ChecksumMismatch` or `NetworkFailure`.
    fn resolve(&self, coordinate: &ArtifactCoordinate) -> Result<ResolvedArtifact>;
}

/// Tries several resolvers in order.
///
/// A `NotFound` falls through to the next resolver; any other failure is
/// returned immediately.
#[derive(Default)]
pub struct ChainResolver {
    resolvers: Vec<Box<dyn ArtifactResolver>>,
}

impl ChainResolver {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a resolver to the chain.
    #[must_use]
    pub fn with(mut self, resolver: impl ArtifactResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Number of resolvers in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Whether the chain has no resolvers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl std::fmt::Debug for ChainResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.resolvers.iter().map(|r| r.name()))
            .finish()
    }
}

impl ArtifactResolver for ChainResolver {
    fn name(&self) -> &str {
        "chain"
    }

    fn resolve(&self, coordinate: &ArtifactCoordinate) -> Result<ResolvedArtifact> {
        let mut tried = Vec::with_capacity(self.resolvers.len());
        for resolver in &self.resolvers {
            match resolver.resolve(coordinate) {
                Ok(resolved) => {
                    tracing::debug!(
                        coordinate = %coordinate,
                        resolver = resolver.name(),
                        path = %resolved.path.display(),
                        "artifact resolved"
                    );
                    return Ok(resolved);
                }
                Err(e) if e.resolution_kind() == Some(ResolutionErrorKind::NotFound) => {
                    tracing::debug!(coordinate = %coordinate, resolver = resolver.name(), "not found");
                    tried.push(resolver.name().to_string());
                }
                Err(e) => return Err(e),
            }
        }
        Err(StackError::resolution(
            coordinate,
            ResolutionErrorKind::NotFound,
            if tried.is_empty() {
                "no repositories configured".to_string()
            } else {
                format!("searched {}", tried.join(", "))
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    struct Fixed {
        name: &'static str,
        outcome: Option<ResolutionErrorKind>,
        calls: Arc<AtomicUsize>,
    }

    impl ArtifactResolver for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn resolve(&self, coordinate: &ArtifactCoordinate) -> Result<ResolvedArtifact> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                None => Ok(ResolvedArtifact {
                    path: PathBuf::from(self.name),
                    fingerprint: None,
                }),
                Some(kind) => Err(StackError::resolution(coordinate, kind, "fixed")),
            }
        }
    }

    fn fixed(name: &'static str, outcome: Option<ResolutionErrorKind>) -> (Fixed, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Fixed {
                name,
                outcome,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }

    fn coord() -> ArtifactCoordinate {
        ArtifactCoordinate::new("com.example", "widgets", "1.0").expect("coordinate")
    }

    #[test]
    fn chain_falls_through_not_found() {
        let (first, _) = fixed("first", Some(ResolutionErrorKind::NotFound));
        let (second, _) = fixed("second", None);
        let chain = ChainResolver::new().with(first).with(second);
        let resolved = chain.resolve(&coord()).expect("resolve");
        assert_eq!(resolved.path, PathBuf::from("second"));
    }

    #[test]
    fn chain_stops_on_checksum_mismatch() {
        let (first, _) = fixed("first", Some(ResolutionErrorKind::ChecksumMismatch));
        let (second, calls) = fixed("second", None);
        let chain = ChainResolver::new().with(first).with(second);
        let err = chain.resolve(&coord()).expect_err("must fail");
        assert_eq!(err.resolution_kind(), Some(ResolutionErrorKind::ChecksumMismatch));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn chain_reports_not_found_when_exhausted() {
        let (first, _) = fixed("first", Some(ResolutionErrorKind::NotFound));
        let chain = ChainResolver::new().with(first);
        let err = chain.resolve(&coord()).expect_err("must fail");
        assert_eq!(err.resolution_kind(), Some(ResolutionErrorKind::NotFound));
        assert!(err.to_string().contains("first"));
    }

    #[test]
    fn empty_chain_is_not_found() {
        let chain = ChainResolver::new();
        assert!(chain.is_empty());
        let err = chain.resolve(&coord()).expect_err("must fail");
        assert_eq!(err.resolution_kind(), Some(ResolutionErrorKind::NotFound));
    }
}
