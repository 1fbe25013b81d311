//! `stack-builder status`: inspect a built stack.

use std::path::{Path, PathBuf};

use clap::Args;
use stack_model::manifest::StackManifest;
use stack_model::record::InstalledArtifact;

use crate::output::{BOLD, DIM, GREEN, RESET, YELLOW, format_bytes, plural, short_hash};

/// Arguments for the `status` command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Stack directory.
    #[arg(default_value = ".")]
    pub directory: PathBuf,
}

/// Executes the `status` command.
///
/// # Errors
///
/// Returns an error if the directory has no readable manifest.
pub fn execute(args: &StatusArgs) -> anyhow::Result<()> {
    let Some(manifest) = StackManifest::load(&args.directory)? else {
        anyhow::bail!("no stack manifest in {}", args.directory.display());
    };

    println!("Stack: {BOLD}{}{RESET}", manifest.directory.display());
    if let Some(base) = &manifest.base {
        println!("Base:  {base}");
    }
    println!(
        "Built: {} {DIM}({}){RESET}",
        manifest.written_at,
        if manifest.complete { "complete" } else { "interrupted" }
    );
    println!();

    for record in &manifest.artifacts {
        print_record(&args.directory, record);
    }
    if !manifest.files.is_empty() {
        println!("  {GREEN}+{RESET} {}", plural(manifest.files.len(), "additional file"));
    }
    Ok(())
}

fn print_record(root: &Path, record: &InstalledArtifact) {
    let missing = record
        .destinations
        .iter()
        .filter(|d| !root.join(d).exists())
        .count();
    let size: u64 = record
        .destinations
        .iter()
        .filter_map(|d| std::fs::metadata(root.join(d)).ok())
        .map(|m| m.len())
        .sum();
    let health = if missing == 0 {
        format!("{GREEN}intact{RESET}")
    } else {
        format!("{YELLOW}{} missing{RESET}", plural(missing, "file"))
    };

    println!("  {} {DIM}[{}]{RESET}", record.coordinate, record.role);
    println!(
        "      {}, {}, sha256 {}, {health}",
        plural(record.destinations.len(), "file"),
        format_bytes(size),
        short_hash(record.fingerprint.as_ref()),
    );
}
