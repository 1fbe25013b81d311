//! The composition engine.
//!
//! A build validates the descriptor, loads the previous manifest, resolves
//! every layer through the [`pipeline`](crate::pipeline), applies layers
//! base first in declaration order, copies additional files and persists a
//! new manifest. Layers whose previous record still matches are skipped.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use stack_artifact::archive::{ArchiveExtractor, Unpacker};
use stack_artifact::resolver::{ArtifactResolver, ResolvedArtifact};
use stack_common::constants::DEFAULT_RESOLVE_CONCURRENCY;
use stack_common::error::{Result, StackError};
use stack_common::types::{ArtifactCoordinate, Sha256Hash};
use stack_model::dependency::{LayerRole, StackDependency};
use stack_model::descriptor::StackDescriptor;
use stack_model::file::AdditionalFile;
use stack_model::manifest::StackManifest;
use stack_model::record::InstalledArtifact;

use crate::cleanup;
use crate::error::{BuildError, BuildResult};
use crate::layer;
use crate::pipeline::{self, PipelineFailure};
use crate::state::BuildState;

/// Tuning knobs for a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Maximum number of layers resolved at once.
    pub concurrency: usize,
    /// Delete files owned by the previous manifest that no current layer
    /// or file accounts for.
    pub prune: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_RESOLVE_CONCURRENCY,
            prune: false,
        }
    }
}

/// Summary of a successful build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Stack directory.
    pub directory: PathBuf,
    /// Layers extracted or copied by this build, in application order.
    pub applied: Vec<ArtifactCoordinate>,
    /// Layers whose previous record still matched.
    pub skipped: Vec<ArtifactCoordinate>,
    /// Recorded layers that are no longer declared.
    pub orphaned: Vec<ArtifactCoordinate>,
    /// Files deleted by pruning, relative to the stack directory.
    pub pruned: Vec<PathBuf>,
    /// Additional files written, relative to the stack directory.
    pub files: Vec<PathBuf>,
    /// Manifest location.
    pub manifest: PathBuf,
}

/// Materializes stack descriptors.
pub struct CompositionEngine {
    resolver: Box<dyn ArtifactResolver>,
    extractor: Box<dyn ArchiveExtractor>,
    options: EngineOptions,
    cancel: Arc<AtomicBool>,
    state: BuildState,
}

impl CompositionEngine {
    /// Creates an engine resolving through `resolver` and extracting with
    /// the built-in [`Unpacker`].
    pub fn new(resolver: impl ArtifactResolver + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
            extractor: Box::new(Unpacker),
            options: EngineOptions::default(),
            cancel: Arc::new(AtomicBool::new(false)),
            state: BuildState::Init,
        }
    }

    /// Replaces the archive extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: impl ArchiveExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// Replaces the build options.
    #[must_use]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Shares an externally owned cancel flag, e.g. one set by a signal
    /// handler.
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Flag that cancels the running build once set.
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// State reached by the last build.
    #[must_use]
    pub const fn state(&self) -> BuildState {
        self.state
    }

    /// Builds the stack described by `descriptor`.
    ///
    /// On return, `descriptor.artifacts` holds the records matching what
    /// is on disk, whether the build succeeded or not.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] naming the stage and the layer or file in
    /// progress. Layers applied before the failure stay on disk and in the
    /// manifest.
    pub fn build(&mut self, descriptor: &mut StackDescriptor) -> BuildResult<BuildReport> {
        tracing::info!(
            directory = %descriptor.directory.display(),
            layers = descriptor.layers().count(),
            files = descriptor.files.len(),
            "starting stack build"
        );
        self.state = BuildState::Init;
        let result = self.execute(descriptor);
        match &result {
            Ok(report) => {
                self.state = BuildState::Done;
                tracing::info!(
                    applied = report.applied.len(),
                    skipped = report.skipped.len(),
                    files = report.files.len(),
                    "stack build complete"
                );
            }
            Err(e) => {
                self.state = BuildState::Failed;
                tracing::error!(stage = %e.stage, subject = %e.subject, error = %e.source, "stack build failed");
            }
        }
        result
    }

    fn execute(&self, descriptor: &mut StackDescriptor) -> BuildResult<BuildReport> {
        let root = descriptor.directory.clone();
        let subject = root.display().to_string();
        let init_error = |e: StackError| BuildError::new(BuildState::Init, subject.clone(), e);

        stack_model::validator::validate(descriptor).map_err(init_error)?;
        std::fs::create_dir_all(&root).map_err(|e| init_error(StackError::io(&root, e)))?;
        let prior_files = match StackManifest::load(&root).map_err(init_error)? {
            Some(manifest) => {
                descriptor.artifacts = manifest.artifacts;
                manifest.files
            }
            None => Vec::new(),
        };

        let layers: Vec<(LayerRole, StackDependency)> = descriptor
            .layers()
            .map(|(role, dependency)| (role, dependency.clone()))
            .collect();
        let dependencies: Vec<StackDependency> =
            layers.iter().map(|(_, dependency)| dependency.clone()).collect();

        let mut run = LayerRun::new(&root, &*self.extractor, descriptor.artifacts.clone(), prior_files);
        if self.options.prune {
            run.expect_removal(&layers, &descriptor.files);
        }
        run.transition(BuildState::ResolvingBase);
        if descriptor.base.is_none() {
            tracing::debug!("no base layer declared");
        }

        let outcome = pipeline::resolve_in_order(
            &*self.resolver,
            &dependencies,
            self.options.concurrency,
            &self.cancel,
            |index, resolved| {
                let (role, dependency) = &layers[index];
                run.apply(*role, dependency, resolved)
            },
        );
        if let Err(failure) = outcome {
            descriptor.artifacts = run.checkpoint_records();
            let (role, dependency) = &layers[failure.index];
            let stage = stage_of(*role);
            return Err(match failure.error {
                PipelineFailure::Resolve(e) => BuildError::new(stage, dependency.label(), e),
                PipelineFailure::Apply(e) => e,
                PipelineFailure::Cancelled => {
                    BuildError::new(stage, dependency.label(), StackError::Cancelled)
                }
            });
        }
        if run.state == BuildState::ResolvingBase {
            run.transition(BuildState::ApplyingDependencies);
        }

        run.transition(BuildState::ApplyingFiles);
        for file in &descriptor.files {
            let destination = file.destination().display().to_string();
            if self.cancel.load(Ordering::SeqCst) {
                descriptor.artifacts = run.checkpoint_records();
                return Err(BuildError::new(BuildState::ApplyingFiles, destination, StackError::Cancelled));
            }
            match file.apply(&root) {
                Ok(written) => run.files.extend(written),
                Err(e) => {
                    descriptor.artifacts = run.checkpoint_records();
                    return Err(BuildError::new(BuildState::ApplyingFiles, destination, e));
                }
            }
        }

        run.transition(BuildState::PersistingManifest);
        let persist_error = |e: StackError| BuildError::new(BuildState::PersistingManifest, subject.clone(), e);
        let (records, files) = run.finish(self.options.prune).map_err(persist_error)?;
        descriptor.artifacts.clone_from(&records);
        let manifest = StackManifest::new(&root, records, files, true);
        run.report.manifest = manifest.save(&root).map_err(persist_error)?;
        run.report.files.clone_from(&run.files);
        Ok(run.report)
    }
}

impl std::fmt::Debug for CompositionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositionEngine")
            .field("resolver", &self.resolver.name())
            .field("options", &self.options)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

const fn stage_of(role: LayerRole) -> BuildState {
    match role {
        LayerRole::Base => BuildState::ResolvingBase,
        LayerRole::Regular => BuildState::ApplyingDependencies,
    }
}

/// Mutable state of one build, owned by the applying thread.
struct LayerRun<'a> {
    root: &'a Path,
    extractor: &'a dyn ArchiveExtractor,
    /// Records loaded from the previous manifest.
    prior: Vec<InstalledArtifact>,
    prior_files: Vec<PathBuf>,
    /// Records of the layers processed so far, in order.
    records: Vec<InstalledArtifact>,
    /// Paths written by this build or about to be pruned; a later layer
    /// touching one of them cannot be skipped.
    written: HashSet<PathBuf>,
    files: Vec<PathBuf>,
    report: BuildReport,
    state: BuildState,
}

impl<'a> LayerRun<'a> {
    fn new(
        root: &'a Path,
        extractor: &'a dyn ArchiveExtractor,
        prior: Vec<InstalledArtifact>,
        prior_files: Vec<PathBuf>,
    ) -> Self {
        Self {
            root,
            extractor,
            prior,
            prior_files,
            records: Vec::new(),
            written: HashSet::new(),
            files: Vec::new(),
            report: BuildReport {
                directory: root.to_path_buf(),
                ..BuildReport::default()
            },
            state: BuildState::Init,
        }
    }

    fn transition(&mut self, next: BuildState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(from = %self.state, to = %next, "unexpected build state transition");
        }
        tracing::debug!(from = %self.state, to = %next, "build state");
        self.state = next;
    }

    fn apply(&mut self, role: LayerRole, dependency: &StackDependency, resolved: ResolvedArtifact) -> BuildResult<()> {
        if role == LayerRole::Regular && self.state == BuildState::ResolvingBase {
            self.transition(BuildState::ApplyingDependencies);
        }
        let stage = self.state;
        let coordinate = dependency.coordinate();

        if let Some(mut record) = self.reusable(coordinate, resolved.fingerprint.as_ref()).cloned() {
            tracing::info!(coordinate = %coordinate, role = %role, "layer unchanged, skipping");
            record.role = role;
            self.records.push(record);
            self.report.skipped.push(coordinate.clone());
            return Ok(());
        }

        tracing::info!(
            coordinate = %coordinate,
            role = %role,
            source = %resolved.path.display(),
            "applying layer"
        );
        let destinations = layer::materialize(self.extractor, self.root, dependency, &resolved)
            .map_err(|e| BuildError::new(stage, dependency.label(), e))?;
        self.written.extend(destinations.iter().cloned());
        self.invalidate_overlapping(&destinations);
        self.records.push(InstalledArtifact::new(
            coordinate.clone(),
            role,
            resolved.path,
            destinations,
            resolved.fingerprint,
        ));
        self.report.applied.push(coordinate.clone());

        StackManifest::new(self.root, self.checkpoint_records(), self.prior_files.clone(), false)
            .save(self.root)
            .map(|_| ())
            .map_err(|e| BuildError::new(stage, dependency.label(), e))
    }

    /// Marks for removal the files of recorded layers that are no longer
    /// declared, and of additional files no longer declared, so declared
    /// layers sharing those paths are applied again before pruning.
    fn expect_removal(&mut self, layers: &[(LayerRole, StackDependency)], files: &[AdditionalFile]) {
        let declared: HashSet<String> = layers
            .iter()
            .map(|(_, dependency)| dependency.coordinate().key())
            .collect();
        for record in self.prior.iter().filter(|r| !declared.contains(&r.key())) {
            self.written.extend(record.destinations.iter().cloned());
        }
        let stale_files = self
            .prior_files
            .iter()
            .filter(|path| !files.iter().any(|file| path.starts_with(file.destination())));
        self.written.extend(stale_files.cloned());
    }

    /// Prior records of layers not processed yet that share a path with
    /// `destinations` no longer describe the disk. Their fingerprint is
    /// dropped so the layer is applied again, in this build or after a
    /// failure in the next one.
    fn invalidate_overlapping(&mut self, destinations: &[PathBuf]) {
        let processed: HashSet<String> = self.records.iter().map(InstalledArtifact::key).collect();
        let written: HashSet<&PathBuf> = destinations.iter().collect();
        for record in &mut self.prior {
            if record.fingerprint.is_none() || processed.contains(&record.key()) {
                continue;
            }
            if record.destinations.iter().any(|d| written.contains(d)) {
                tracing::debug!(coordinate = %record.coordinate, "layer overwritten, record invalidated");
                record.fingerprint = None;
            }
        }
    }

    /// The previous record for `coordinate`, if the layer can be skipped.
    fn reusable(&self, coordinate: &ArtifactCoordinate, fingerprint: Option<&Sha256Hash>) -> Option<&InstalledArtifact> {
        let key = coordinate.key();
        self.prior
            .iter()
            .find(|record| record.key() == key)
            .filter(|record| record.matches(coordinate, fingerprint))
            .filter(|record| record.is_intact(self.root))
            .filter(|record| !record.destinations.iter().any(|d| self.written.contains(d)))
    }

    /// Records describing the disk right now: processed layers, then
    /// previous records of layers not processed yet.
    fn checkpoint_records(&self) -> Vec<InstalledArtifact> {
        let processed: HashSet<String> = self.records.iter().map(InstalledArtifact::key).collect();
        self.records
            .iter()
            .cloned()
            .chain(self.prior.iter().filter(|r| !processed.contains(&r.key())).cloned())
            .collect()
    }

    /// Settles orphans and returns the final records and additional files.
    ///
    /// Without pruning, files recorded by the previous build and not
    /// written again stay on disk and stay in the manifest.
    fn finish(&mut self, prune: bool) -> Result<(Vec<InstalledArtifact>, Vec<PathBuf>)> {
        let processed: HashSet<String> = self.records.iter().map(InstalledArtifact::key).collect();
        let orphans: Vec<&InstalledArtifact> =
            self.prior.iter().filter(|r| !processed.contains(&r.key())).collect();
        for orphan in &orphans {
            tracing::warn!(coordinate = %orphan.coordinate, "recorded layer is no longer declared");
            self.report.orphaned.push(orphan.coordinate.clone());
        }

        if !prune {
            let current: HashSet<&PathBuf> = self.files.iter().collect();
            let carried: Vec<PathBuf> = self
                .prior_files
                .iter()
                .filter(|path| !current.contains(path))
                .cloned()
                .collect();
            if !carried.is_empty() {
                tracing::warn!(files = carried.len(), "recorded files are no longer declared");
            }
            let mut files = self.files.clone();
            files.extend(carried);
            return Ok((self.checkpoint_records(), files));
        }

        let owned: HashSet<&PathBuf> = self
            .records
            .iter()
            .flat_map(|r| r.destinations.iter())
            .chain(self.files.iter())
            .collect();
        let mut stale: Vec<&PathBuf> = self
            .prior
            .iter()
            .flat_map(|r| r.destinations.iter())
            .chain(self.prior_files.iter())
            .filter(|path| !owned.contains(path))
            .collect();
        stale.sort();
        stale.dedup();
        let removal = cleanup::remove_paths(self.root, stale)?;
        tracing::info!(removed = removal.removed.len(), "pruned files of undeclared layers");
        self.report.pruned = removal.removed;
        Ok((self.records.clone(), self.files.clone()))
    }
}
