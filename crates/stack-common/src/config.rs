//! Global configuration model for the stack builder.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StackError};

/// Root configuration for artifact resolution and builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuilderConfig {
    /// Local repository searched before any remote one.
    pub local_repository: PathBuf,
    /// Remote repository base URLs, searched in order.
    pub remote_repositories: Vec<String>,
    /// Directory remote artifacts are downloaded into.
    pub cache_dir: PathBuf,
    /// Whether offline mode is enabled (blocks all remote resolution).
    pub offline: bool,
    /// Maximum number of artifacts resolved concurrently.
    pub resolve_concurrency: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            local_repository: crate::constants::default_local_repository(),
            remote_repositories: vec![crate::constants::MAVEN_CENTRAL.to_string()],
            cache_dir: crate::constants::default_cache_dir(),
            offline: false,
            resolve_concurrency: crate::constants::DEFAULT_RESOLVE_CONCURRENCY,
        }
    }
}

impl BuilderConfig {
    /// Loads a configuration file, falling back to defaults for missing keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// holds an out-of-range value.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StackError::io(path, e))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be loaded.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `StackError::Config` if a value is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.resolve_concurrency == 0 {
            return Err(StackError::config("resolve_concurrency must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_maven_central() {
        let config = BuilderConfig::default();
        assert_eq!(config.remote_repositories, vec![crate::constants::MAVEN_CENTRAL]);
        assert!(!config.offline);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_fills_missing_keys_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "offline": true, "resolve_concurrency": 2 }"#).expect("write");

        let config = BuilderConfig::load(&path).expect("load");
        assert!(config.offline);
        assert_eq!(config.resolve_concurrency, 2);
        assert_eq!(config.remote_repositories, vec![crate::constants::MAVEN_CENTRAL]);
    }

    #[test]
    fn load_rejects_unknown_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "proxy": "http://localhost" }"#).expect("write");
        assert!(BuilderConfig::load(&path).is_err());
    }

    #[test]
    fn load_rejects_zero_concurrency() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "resolve_concurrency": 0 }"#).expect("write");
        assert!(matches!(
            BuilderConfig::load(&path),
            Err(StackError::Config { .. })
        ));
    }

    #[test]
    fn load_or_default_without_file_returns_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = BuilderConfig::load_or_default(&dir.path().join("missing.json")).expect("load");
        assert_eq!(config, BuilderConfig::default());
    }
}
