//! `stack-builder plan`: show what a build would change.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use stack_engine::plan::PlanAction;

use crate::output::{BOLD, CYAN, DIM, GREEN, RESET, YELLOW, plural};

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Stack descriptor (`.json`, `.yaml` or `.yml`).
    #[arg(default_value = "stack.json")]
    pub descriptor: PathBuf,

    /// Output directory, overriding the descriptor's `directory`.
    #[arg(short, long)]
    pub directory: Option<PathBuf>,
}

/// Executes the `plan` command.
///
/// Compares the descriptor with the stack's manifest and lists the
/// expected action per layer, in application order.
///
/// # Errors
///
/// Returns an error if the descriptor or manifest cannot be read.
pub fn execute(args: PlanArgs) -> anyhow::Result<()> {
    let descriptor =
        stack_model::loader::load_descriptor(&args.descriptor, args.directory.as_deref())
            .with_context(|| format!("invalid descriptor {}", args.descriptor.display()))?;
    let plan = stack_engine::plan::plan(&descriptor)?;

    println!("Plan for: {BOLD}{}{RESET}", plan.directory.display());
    println!();
    for layer in &plan.layers {
        let marker = match layer.action {
            PlanAction::Install => format!("{GREEN}+{RESET}"),
            PlanAction::Update { .. } => format!("{CYAN}~{RESET}"),
            PlanAction::Repair => format!("{YELLOW}!{RESET}"),
            PlanAction::Verify => format!("{DIM}={RESET}"),
        };
        println!("  {marker} {} {DIM}[{}]{RESET}", layer.label, layer.role);
        println!("      {}", layer.action);
    }
    for destination in &plan.files {
        println!("  {GREEN}+{RESET} {} {DIM}[file]{RESET}", destination.display());
    }
    for orphan in &plan.orphans {
        println!("  {YELLOW}?{RESET} {orphan} {DIM}(no longer declared; removed with --prune){RESET}");
    }

    println!();
    if plan.is_up_to_date() {
        println!("  All layers are installed; the build only re-verifies them.");
    } else {
        println!(
            "  {} and {} will be applied.",
            plural(plan.layers.len(), "layer"),
            plural(plan.files.len(), "file")
        );
    }
    Ok(())
}
