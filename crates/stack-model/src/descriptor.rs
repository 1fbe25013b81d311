//! The stack descriptor: aggregate root of a build.

use std::path::{Path, PathBuf};

use stack_common::constants::MANIFEST_FILE_NAME;
use stack_common::error::{Result, StackError};

use crate::dependency::{LayerRole, StackDependency};
use crate::file::AdditionalFile;
use crate::record::InstalledArtifact;

/// Everything needed to materialize one stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDescriptor {
    /// Absolute output directory.
    pub directory: PathBuf,
    /// File the descriptor was loaded from, for diagnostics.
    pub descriptor: Option<PathBuf>,
    /// Inherited distribution; `None` when the directory already holds one.
    pub base: Option<StackDependency>,
    /// Layers applied after the base, in order.
    pub dependencies: Vec<StackDependency>,
    /// Files copied after every layer, in order.
    pub files: Vec<AdditionalFile>,
    /// Records of the last build, base first.
    pub artifacts: Vec<InstalledArtifact>,
}

impl StackDescriptor {
    /// Creates an empty descriptor targeting `directory`.
    ///
    /// Relative directories are made absolute against the working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory is empty or cannot be made absolute.
    pub fn new(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref();
        if directory.as_os_str().is_empty() {
            return Err(StackError::config("stack directory must not be empty"));
        }
        let directory = std::path::absolute(directory).map_err(|e| StackError::io(directory, e))?;
        Ok(Self {
            directory,
            descriptor: None,
            base: None,
            dependencies: Vec::new(),
            files: Vec::new(),
            artifacts: Vec::new(),
        })
    }

    /// Sets the inherited stack.
    #[must_use]
    pub fn with_base(mut self, base: StackDependency) -> Self {
        self.base = Some(base);
        self
    }

    /// Appends a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dependency: StackDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Appends an additional file.
    #[must_use]
    pub fn with_file(mut self, file: AdditionalFile) -> Self {
        self.files.push(file);
        self
    }

    /// Every layer in application order: the base first, then dependencies.
    pub fn layers(&self) -> impl Iterator<Item = (LayerRole, &StackDependency)> {
        self.base
            .iter()
            .map(|base| (LayerRole::Base, base))
            .chain(self.dependencies.iter().map(|d| (LayerRole::Regular, d)))
    }

    /// Location of the build manifest.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.directory.join(MANIFEST_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{BaseVariant, canonical_base};
    use stack_common::types::ArtifactCoordinate;

    fn dependency(name: &str) -> StackDependency {
        let coordinate = ArtifactCoordinate::new("com.example", name, "1.0").expect("valid");
        StackDependency::builder(coordinate).build().expect("build")
    }

    #[test]
    fn new_makes_directory_absolute() {
        let descriptor = StackDescriptor::new("target/stack").expect("new");
        assert!(descriptor.directory.is_absolute());
        assert!(descriptor.directory.ends_with("target/stack"));
    }

    #[test]
    fn new_rejects_empty_directory() {
        assert!(StackDescriptor::new("").is_err());
    }

    #[test]
    fn layers_yield_base_first_then_declared_order() {
        let descriptor = StackDescriptor::new("/opt/stack")
            .expect("new")
            .with_dependency(dependency("first"))
            .with_dependency(dependency("second"))
            .with_base(canonical_base(BaseVariant::Min).expect("base"));

        let layers: Vec<_> = descriptor
            .layers()
            .map(|(role, d)| (role, d.coordinate().name().to_string()))
            .collect();
        assert_eq!(
            layers,
            vec![
                (LayerRole::Base, "vertx-stack-dist".to_string()),
                (LayerRole::Regular, "first".to_string()),
                (LayerRole::Regular, "second".to_string()),
            ]
        );
    }

    #[test]
    fn manifest_lives_at_stack_root() {
        let descriptor = StackDescriptor::new("/opt/stack").expect("new");
        assert_eq!(descriptor.manifest_path(), PathBuf::from("/opt/stack/.stack.json"));
    }
}
