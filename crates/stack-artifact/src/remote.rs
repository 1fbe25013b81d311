//! Resolution from a remote HTTP repository.
//!
//! Downloads go through the [`ArtifactCache`]; a cached copy whose content
//! still matches its recorded digest is reused without touching the
//! network.

use stack_common::constants::{APP_NAME, CHECKSUM_EXTENSION};
use stack_common::error::{ResolutionErrorKind, Result, StackError};
use stack_common::types::{ArtifactCoordinate, Sha256Hash};

use crate::hash;
use crate::layout::repository_url_path;
use crate::repository::verified_fingerprint;
use crate::resolver::{ArtifactResolver, ResolvedArtifact};
use crate::storage::ArtifactCache;

/// A remote repository reached over HTTP(S).
#[derive(Debug, Clone)]
pub struct RemoteRepository {
    base_url: String,
    cache: ArtifactCache,
    offline: bool,
    client: reqwest::blocking::Client,
}

impl RemoteRepository {
    /// Creates a resolver for the repository at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `StackError::Config` if the URL is not HTTP(S) or the HTTP
    /// client cannot be initialized.
    pub fn new(base_url: impl Into<String>, cache: ArtifactCache, offline: bool) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(StackError::config(format!(
                "repository URL must use http or https: {base_url}"
            )));
        }
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StackError::config(format!("cannot initialize HTTP client: {e}")))?;
        Ok(Self {
            base_url,
            cache,
            offline,
            client,
        })
    }

    /// Repository base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Download URL of an artifact.
    #[must_use]
    pub fn artifact_url(&self, coordinate: &ArtifactCoordinate) -> String {
        format!("{}/{}", self.base_url, repository_url_path(coordinate))
    }

    fn cached(&self, coordinate: &ArtifactCoordinate) -> Option<ResolvedArtifact> {
        let path = self.cache.artifact_path(coordinate);
        if !path.is_file() {
            return None;
        }
        match verified_fingerprint(coordinate, &path) {
            Ok(fingerprint) => {
                tracing::debug!(coordinate = %coordinate, "using cached artifact");
                Some(ResolvedArtifact {
                    path,
                    fingerprint: Some(fingerprint),
                })
            }
            Err(e) => {
                tracing::warn!(coordinate = %coordinate, error = %e, "discarding cached artifact");
                None
            }
        }
    }

    fn download(&self, coordinate: &ArtifactCoordinate, url: &str) -> Result<Vec<u8>> {
        let network = |message: String| {
            StackError::resolution(coordinate, ResolutionErrorKind::NetworkFailure, message)
        };
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| network(format!("failed to download {url}: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StackError::resolution(
                coordinate,
                ResolutionErrorKind::NotFound,
                format!("{url} returned 404"),
            ));
        }
        if !status.is_success() {
            return Err(network(format!("HTTP {status} downloading {url}")));
        }

        let bytes = response
            .bytes()
            .map_err(|e| network(format!("failed to read response body from {url}: {e}")))?;
        Ok(bytes.to_vec())
    }

    /// Fetches the published checksum; absence is not an error.
    fn published_checksum(&self, coordinate: &ArtifactCoordinate, url: &str) -> Option<Sha256Hash> {
        let checksum_url = format!("{url}.{CHECKSUM_EXTENSION}");
        match self.download(coordinate, &checksum_url) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                match hash::parse_checksum(&text) {
                    Ok(digest) => Some(digest),
                    Err(e) => {
                        tracing::warn!(url = %checksum_url, error = %e, "ignoring malformed checksum");
                        None
                    }
                }
            }
            Err(e) => {
                tracing::debug!(url = %checksum_url, error = %e, "no published checksum");
                None
            }
        }
    }
}

impl ArtifactResolver for RemoteRepository {
    fn name(&self) -> &str {
        &self.base_url
    }

    fn resolve(&self, coordinate: &ArtifactCoordinate) -> Result<ResolvedArtifact> {
        if let Some(resolved) = self.cached(coordinate) {
            return Ok(resolved);
        }
        if self.offline {
            return Err(StackError::resolution(
                coordinate,
                ResolutionErrorKind::NetworkFailure,
                "offline mode is enabled and the artifact is not cached",
            ));
        }

        let url = self.artifact_url(coordinate);
        tracing::info!(coordinate = %coordinate, url = %url, "downloading artifact");
        let content = self.download(coordinate, &url)?;
        let actual = hash::hash_bytes(&content)?;

        if let Some(expected) = self.published_checksum(coordinate, &url) {
            if expected != actual {
                return Err(StackError::resolution(
                    coordinate,
                    ResolutionErrorKind::ChecksumMismatch,
                    format!("{url}: expected {expected}, found {actual}"),
                ));
            }
        }

        let path = self.cache.store(coordinate, &content, &actual)?;
        Ok(ResolvedArtifact {
            path,
            fingerprint: Some(actual),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord() -> ArtifactCoordinate {
        ArtifactCoordinate::new("com.example", "widgets", "1.0").expect("coordinate")
    }

    #[test]
    fn rejects_non_http_urls() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = RemoteRepository::new("ftp://repo", ArtifactCache::open(dir.path()), false);
        assert!(result.is_err());
    }

    #[test]
    fn artifact_url_uses_repository_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let remote = RemoteRepository::new(
            "https://repo.example.com/maven2/",
            ArtifactCache::open(dir.path()),
            false,
        )
        .expect("remote");
        assert_eq!(
            remote.artifact_url(&coord()),
            "https://repo.example.com/maven2/com/example/widgets/1.0/widgets-1.0.jar"
        );
    }

    #[test]
    fn offline_without_cache_is_network_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let remote =
            RemoteRepository::new("https://repo.example.com", ArtifactCache::open(dir.path()), true)
                .expect("remote");
        let err = remote.resolve(&coord()).expect_err("must fail");
        assert_eq!(err.resolution_kind(), Some(ResolutionErrorKind::NetworkFailure));
    }

    #[test]
    fn offline_reuses_verified_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = ArtifactCache::open(dir.path());
        let digest = hash::hash_bytes(b"cached").expect("hash");
        let path = cache.store(&coord(), b"cached", &digest).expect("store");

        let remote = RemoteRepository::new("https://repo.example.com", cache, true).expect("remote");
        let resolved = remote.resolve(&coord()).expect("resolve");
        assert_eq!(resolved.path, path);
        assert_eq!(resolved.fingerprint, Some(digest));
    }

    #[test]
    fn offline_discards_tampered_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = ArtifactCache::open(dir.path());
        let digest = hash::hash_bytes(b"cached").expect("hash");
        let path = cache.store(&coord(), b"cached", &digest).expect("store");
        std::fs::write(&path, b"tampered").expect("tamper");

        let remote = RemoteRepository::new("https://repo.example.com", cache, true).expect("remote");
        let err = remote.resolve(&coord()).expect_err("must fail");
        assert_eq!(err.resolution_kind(), Some(ResolutionErrorKind::NetworkFailure));
    }
}
