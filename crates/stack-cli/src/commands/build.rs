//! `stack-builder build`: materialize a stack from a descriptor.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use stack_engine::engine::{BuildReport, CompositionEngine, EngineOptions};
use stack_engine::error::BuildError;

use super::GlobalArgs;
use crate::output::{BOLD, DIM, GREEN, RED, RESET, YELLOW, plural, print_header};

/// Arguments for the `build` command.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Stack descriptor (`.json`, `.yaml` or `.yml`).
    #[arg(default_value = "stack.json")]
    pub descriptor: PathBuf,

    /// Output directory, overriding the descriptor's `directory`.
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// Delete files of layers that are no longer declared.
    #[arg(long)]
    pub prune: bool,
}

/// Executes the `build` command.
///
/// # Errors
///
/// Returns an error if the configuration or descriptor is invalid, or if
/// the build fails.
pub fn execute(global: &GlobalArgs, args: BuildArgs) -> anyhow::Result<()> {
    let started = Instant::now();
    print_header();

    let config = super::load_config(global)?;
    let mut descriptor =
        stack_model::loader::load_descriptor(&args.descriptor, args.directory.as_deref())
            .with_context(|| format!("invalid descriptor {}", args.descriptor.display()))?;

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    let mut engine = CompositionEngine::new(super::resolver(&config)?)
        .with_options(EngineOptions {
            concurrency: config.resolve_concurrency,
            prune: args.prune,
        })
        .with_cancel_flag(cancel);

    eprintln!(
        "  Building {BOLD}{}{RESET} {DIM}({}, {}){RESET}",
        descriptor.directory.display(),
        plural(descriptor.layers().count(), "layer"),
        plural(descriptor.files.len(), "file"),
    );
    eprintln!();

    match engine.build(&mut descriptor) {
        Ok(report) => {
            print_report(&report);
            eprintln!();
            eprintln!(
                "  {GREEN}{BOLD}Stack ready{RESET} in {:.1}s {DIM}({}){RESET}",
                started.elapsed().as_secs_f64(),
                report.manifest.display()
            );
            Ok(())
        }
        Err(e) => {
            print_failure(&e);
            Err(anyhow::Error::new(e).context("build failed"))
        }
    }
}

fn print_report(report: &BuildReport) {
    for coordinate in &report.applied {
        eprintln!("    {GREEN}+{RESET} {coordinate}");
    }
    for coordinate in &report.skipped {
        eprintln!("    {DIM}= {coordinate} (unchanged){RESET}");
    }
    for coordinate in &report.orphaned {
        eprintln!("    {YELLOW}?{RESET} {coordinate} {DIM}(no longer declared){RESET}");
    }
    if !report.pruned.is_empty() {
        eprintln!("    {YELLOW}-{RESET} pruned {}", plural(report.pruned.len(), "file"));
    }
    if !report.files.is_empty() {
        eprintln!("    {GREEN}+{RESET} {}", plural(report.files.len(), "additional file"));
    }
}

fn print_failure(error: &BuildError) {
    eprintln!("  {RED}{BOLD}Build failed{RESET} while {}", error.stage);
    eprintln!("    subject: {}", error.subject);
    eprintln!("    cause:   {}", error.source);
    if error.is_manifest_persist() {
        eprintln!();
        eprintln!("  {YELLOW}Note:{RESET} every layer was applied but the final manifest was not written.");
        eprintln!("        The next build re-verifies the layers and rewrites it.");
    } else if error.is_checkpoint_failure() {
        eprintln!();
        eprintln!("  {YELLOW}Note:{RESET} {} was applied but could not be recorded;", error.subject);
        eprintln!("        later layers were not applied. The next build re-applies it.");
    } else if error.is_cancelled() {
        eprintln!();
        eprintln!("  {YELLOW}Note:{RESET} layers applied before the interruption are recorded;");
        eprintln!("        running the build again resumes from there.");
    }
}
