//! Repository layout: where a coordinate lives inside a repository.

use std::path::PathBuf;

use stack_common::types::ArtifactCoordinate;

/// Relative path of an artifact: `group/with/slashes/name/version/file`.
#[must_use]
pub fn repository_path(coordinate: &ArtifactCoordinate) -> PathBuf {
    let mut path: PathBuf = coordinate.group().split('.').collect();
    path.push(coordinate.name());
    path.push(coordinate.version());
    path.push(coordinate.file_name());
    path
}

/// Same path as [`repository_path`], joined with `/` for URLs.
#[must_use]
pub fn repository_url_path(coordinate: &ArtifactCoordinate) -> String {
    format!(
        "{}/{}/{}/{}",
        coordinate.group().replace('.', "/"),
        coordinate.name(),
        coordinate.version(),
        coordinate.file_name()
    )
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn layout_splits_group_on_dots() {
        let coord = ArtifactCoordinate::new("io.vertx", "vertx-stack-dist", "3.9.16")
            .and_then(|c| c.with_classifier("min"))
            .and_then(|c| c.with_type("zip"))
            .expect("coordinate");
        assert_eq!(
            repository_path(&coord),
            Path::new("io/vertx/vertx-stack-dist/3.9.16/vertx-stack-dist-3.9.16-min.zip")
        );
        assert_eq!(
            repository_url_path(&coord),
            "io/vertx/vertx-stack-dist/3.9.16/vertx-stack-dist-3.9.16-min.zip"
        );
    }

    #[test]
    fn layout_uses_default_jar_type() {
        let coord = ArtifactCoordinate::new("com.example", "widgets", "1.0").expect("coordinate");
        assert_eq!(
            repository_path(&coord),
            Path::new("com/example/widgets/1.0/widgets-1.0.jar")
        );
    }
}
