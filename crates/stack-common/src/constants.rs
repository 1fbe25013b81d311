//! System-wide constants and default paths.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Fallback data directory when no home directory is available.
pub const SYSTEM_DATA_DIR: &str = "/var/lib/stack-builder";

/// Returns the data directory, preferring `$HOME/.stack-builder`,
/// falling back to `/var/lib/stack-builder`.
fn resolve_data_dir() -> PathBuf {
    home_dir().map_or_else(
        || PathBuf::from(SYSTEM_DATA_DIR),
        |home| home.join(".stack-builder"),
    )
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()
        .map(PathBuf::from)
}

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved data directory for this session.
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(resolve_data_dir)
}

/// Returns the default download cache directory.
pub fn default_cache_dir() -> PathBuf {
    data_dir().join("cache")
}

/// Returns the default configuration file path.
pub fn default_config_file() -> PathBuf {
    data_dir().join("config.json")
}

/// Returns the default local artifact repository (`~/.m2/repository`).
pub fn default_local_repository() -> PathBuf {
    home_dir().map_or_else(
        || PathBuf::from(SYSTEM_DATA_DIR).join("repository"),
        |home| home.join(".m2").join("repository"),
    )
}

/// Name of the manifest file written at the root of every built stack.
pub const MANIFEST_FILE_NAME: &str = ".stack.json";

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// Stack release version the canonical base distributions are pinned to.
pub const STACK_VERSION: &str = "3.9.16";

/// Group of the canonical base distributions.
pub const CANONICAL_BASE_GROUP: &str = "io.vertx";

/// Artifact name of the canonical base distributions.
pub const CANONICAL_BASE_NAME: &str = "vertx-stack-dist";

/// Artifact type of the canonical base distributions.
pub const CANONICAL_BASE_TYPE: &str = "zip";

/// Artifact type assumed for dependencies that do not declare one.
pub const DEFAULT_DEPENDENCY_TYPE: &str = "jar";

/// Default remote repository.
pub const MAVEN_CENTRAL: &str = "https://repo1.maven.org/maven2";

/// Default number of artifacts resolved concurrently.
pub const DEFAULT_RESOLVE_CONCURRENCY: usize = 4;

/// Extension of the checksum sidecar published next to an artifact.
pub const CHECKSUM_EXTENSION: &str = "sha256";

/// SHA-256 digest length in hex characters.
pub const SHA256_HEX_LENGTH: usize = 64;

/// Application name used in CLI output and state files.
pub const APP_NAME: &str = "stack-builder";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "stack-builder";
