//! Dry-run planning: what a build would do, without resolving.

use std::fmt;
use std::path::PathBuf;

use stack_common::error::Result;
use stack_common::types::ArtifactCoordinate;
use stack_model::dependency::LayerRole;
use stack_model::descriptor::StackDescriptor;
use stack_model::manifest::StackManifest;
use stack_model::record::InstalledArtifact;

/// What a build is expected to do with one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanAction {
    /// No previous record: the layer will be applied.
    Install,
    /// A previous record has another coordinate, usually another version.
    Update {
        /// Previously installed coordinate.
        from: ArtifactCoordinate,
    },
    /// Same coordinate, but recorded files are missing.
    Repair,
    /// Same coordinate and files present; the fingerprint decides at build
    /// time whether the layer is skipped.
    Verify,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => write!(f, "install"),
            Self::Update { from } => write!(f, "update from {}", from.version()),
            Self::Repair => write!(f, "repair"),
            Self::Verify => write!(f, "verify"),
        }
    }
}

/// One layer of a [`BuildPlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLayer {
    /// Base or regular dependency.
    pub role: LayerRole,
    /// Human-readable layer name.
    pub label: String,
    /// Declared coordinate.
    pub coordinate: ArtifactCoordinate,
    /// Expected action.
    pub action: PlanAction,
}

/// The expected effect of building a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    /// Stack directory.
    pub directory: PathBuf,
    /// Layers in application order.
    pub layers: Vec<PlannedLayer>,
    /// Destinations of additional files, in application order.
    pub files: Vec<PathBuf>,
    /// Recorded layers that are no longer declared.
    pub orphans: Vec<ArtifactCoordinate>,
}

impl BuildPlan {
    /// Whether building is expected to change nothing but the additional
    /// files.
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.orphans.is_empty() && self.layers.iter().all(|l| l.action == PlanAction::Verify)
    }
}

/// Compares a descriptor with the records of its last build.
///
/// Records come from the manifest on disk when there is one, otherwise
/// from `descriptor.artifacts`.
///
/// # Errors
///
/// Returns an error if an existing manifest cannot be read.
pub fn plan(descriptor: &StackDescriptor) -> Result<BuildPlan> {
    let records = match StackManifest::load(&descriptor.directory)? {
        Some(manifest) => manifest.artifacts,
        None => descriptor.artifacts.clone(),
    };

    let layers: Vec<PlannedLayer> = descriptor
        .layers()
        .map(|(role, dependency)| {
            let coordinate = dependency.coordinate();
            let action = action_for(&records, coordinate, &descriptor.directory);
            PlannedLayer {
                role,
                label: dependency.label(),
                coordinate: coordinate.clone(),
                action,
            }
        })
        .collect();

    let declared: Vec<String> = layers.iter().map(|l| l.coordinate.key()).collect();
    let orphans = records
        .iter()
        .filter(|r| !declared.contains(&r.key()))
        .map(|r| r.coordinate.clone())
        .collect();

    Ok(BuildPlan {
        directory: descriptor.directory.clone(),
        layers,
        files: descriptor
            .files
            .iter()
            .map(|f| f.destination().to_path_buf())
            .collect(),
        orphans,
    })
}

fn action_for(
    records: &[InstalledArtifact],
    coordinate: &ArtifactCoordinate,
    root: &std::path::Path,
) -> PlanAction {
    let key = coordinate.key();
    match records.iter().find(|r| r.key() == key) {
        None => PlanAction::Install,
        Some(record) if record.coordinate != *coordinate => PlanAction::Update {
            from: record.coordinate.clone(),
        },
        Some(record) if !record.is_intact(root) => PlanAction::Repair,
        Some(_) => PlanAction::Verify,
    }
}

#[cfg(test)]
mod tests {
    use stack_model::dependency::StackDependency;

    use super::*;

    fn coordinate(name: &str, version: &str) -> ArtifactCoordinate {
        ArtifactCoordinate::new("com.example", name, version).expect("coordinate")
    }

    fn dependency(name: &str, version: &str) -> StackDependency {
        StackDependency::builder(coordinate(name, version))
            .build()
            .expect("dependency")
    }

    fn record(name: &str, version: &str, file: &str) -> InstalledArtifact {
        InstalledArtifact::new(
            coordinate(name, version),
            LayerRole::Regular,
            PathBuf::from("/repo/x.jar"),
            vec![PathBuf::from(file)],
            None,
        )
    }

    #[test]
    fn plan_classifies_each_layer() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a-1.jar"), b"a").expect("write");
        let mut descriptor = StackDescriptor::new(dir.path())
            .expect("descriptor")
            .with_dependency(dependency("a", "1"))
            .with_dependency(dependency("b", "2"))
            .with_dependency(dependency("c", "1"))
            .with_dependency(dependency("d", "1"));
        descriptor.artifacts = vec![
            record("a", "1", "a-1.jar"),
            record("b", "1", "b-1.jar"),
            record("c", "1", "c-1.jar"),
            record("old", "1", "old-1.jar"),
        ];

        let plan = plan(&descriptor).expect("plan");
        let actions: Vec<String> = plan.layers.iter().map(|l| l.action.to_string()).collect();

        assert_eq!(actions, vec!["verify", "update from 1", "repair", "install"]);
        assert_eq!(plan.orphans, vec![coordinate("old", "1")]);
        assert!(!plan.is_up_to_date());
    }

    #[test]
    fn plan_of_unbuilt_stack_installs_everything() {
        let dir = tempfile::tempdir().expect("tempdir");
        let descriptor = StackDescriptor::new(dir.path().join("new"))
            .expect("descriptor")
            .with_dependency(dependency("a", "1"));

        let plan = plan(&descriptor).expect("plan");
        assert_eq!(plan.layers[0].action, PlanAction::Install);
        assert!(plan.orphans.is_empty());
    }
}
