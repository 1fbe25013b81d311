//! `stack-builder uninstall`: remove a built stack.

use std::path::PathBuf;

use clap::Args;

use crate::output::{DIM, GREEN, RESET, plural};

/// Arguments for the `uninstall` command.
#[derive(Args, Debug)]
pub struct UninstallArgs {
    /// Stack directory.
    pub directory: PathBuf,
}

/// Executes the `uninstall` command.
///
/// Files not listed in the manifest are left in place.
///
/// # Errors
///
/// Returns an error if the directory has no manifest or a file cannot be
/// removed.
pub fn execute(args: &UninstallArgs) -> anyhow::Result<()> {
    let report = stack_engine::uninstall::uninstall(&args.directory)?;
    eprintln!(
        "  {GREEN}Removed{RESET} {} from {}",
        plural(report.removed.len(), "file"),
        args.directory.display()
    );
    if !report.missing.is_empty() {
        eprintln!("  {DIM}{} already gone{RESET}", plural(report.missing.len(), "file"));
    }
    Ok(())
}
