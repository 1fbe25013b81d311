//! CLI command definitions and dispatch.

pub mod build;
pub mod plan;
pub mod status;
pub mod uninstall;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use stack_artifact::remote::RemoteRepository;
use stack_artifact::repository::LocalRepository;
use stack_artifact::resolver::ChainResolver;
use stack_artifact::storage::ArtifactCache;
use stack_common::config::BuilderConfig;

/// stack-builder: compose stacks from a base, dependencies and files.
#[derive(Parser, Debug)]
#[command(name = stack_common::constants::BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Configuration file (defaults to `~/.stack-builder/config.json`).
    #[arg(long, global = true, env = "STACK_BUILDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable offline mode (only the local repository and cache are used).
    #[arg(long, global = true)]
    pub offline: bool,

    /// Remote repository URL; repeat to search several, replacing the
    /// configured list.
    #[arg(long = "repository", global = true, value_name = "URL")]
    pub repositories: Vec<String>,

    /// Local repository directory searched before any remote one.
    #[arg(long, global = true, value_name = "DIR")]
    pub local_repository: Option<PathBuf>,

    /// Maximum number of artifacts resolved concurrently.
    #[arg(short, long, global = true)]
    pub jobs: Option<usize>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build or update a stack from a descriptor.
    Build(build::BuildArgs),
    /// Show what a build would change, without resolving anything.
    Plan(plan::PlanArgs),
    /// Show the manifest of a built stack and check it for drift.
    Status(status::StatusArgs),
    /// Remove every file a stack's manifest accounts for.
    Uninstall(uninstall::UninstallArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Build(args) => build::execute(&cli.global, args),
        Command::Plan(args) => plan::execute(args),
        Command::Status(args) => status::execute(&args),
        Command::Uninstall(args) => uninstall::execute(&args),
    }
}

/// Loads the configuration file and applies command-line overrides.
///
/// An explicit `--config` must exist; the default location is optional.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded or a value is invalid.
pub fn load_config(global: &GlobalArgs) -> anyhow::Result<BuilderConfig> {
    let mut config = match &global.config {
        Some(path) => BuilderConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => BuilderConfig::load_or_default(&stack_common::constants::default_config_file())
            .context("failed to load the default configuration")?,
    };

    if global.offline {
        config.offline = true;
    }
    if !global.repositories.is_empty() {
        config.remote_repositories.clone_from(&global.repositories);
    }
    if let Some(dir) = &global.local_repository {
        config.local_repository.clone_from(dir);
    }
    if let Some(jobs) = global.jobs {
        config.resolve_concurrency = jobs;
    }
    config.validate()?;
    tracing::debug!(?config, "effective configuration");
    Ok(config)
}

/// Chains the local repository with every configured remote one.
///
/// # Errors
///
/// Returns an error if a remote repository URL is invalid.
pub fn resolver(config: &BuilderConfig) -> anyhow::Result<ChainResolver> {
    let cache = ArtifactCache::open(&config.cache_dir);
    let mut chain = ChainResolver::new().with(LocalRepository::new(&config.local_repository));
    for url in &config.remote_repositories {
        chain = chain.with(RemoteRepository::new(url.as_str(), cache.clone(), config.offline)?);
    }
    Ok(chain)
}
