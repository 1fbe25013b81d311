//! Formatted output helpers for CLI commands.
//!
//! Provides colored status markers and human-readable byte and count
//! formatting.

use stack_common::types::Sha256Hash;

pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const GREEN: &str = "\x1b[32m";
pub const CYAN: &str = "\x1b[36m";
pub const YELLOW: &str = "\x1b[33m";
pub const RED: &str = "\x1b[31m";
pub const RESET: &str = "\x1b[0m";

/// Prints the program banner to stderr.
pub fn print_header() {
    eprintln!();
    eprintln!("  {BOLD}stack-builder{RESET} {DIM}v{}{RESET}", env!("CARGO_PKG_VERSION"));
    eprintln!();
}

/// Formats a byte count into a human-readable string (e.g., "128.0 MiB").
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;

    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// `1 file`, `3 files`.
#[must_use]
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// First 12 hex digits of a fingerprint, or `-` when there is none.
#[must_use]
pub fn short_hash(hash: Option<&Sha256Hash>) -> String {
    hash.map_or_else(|| "-".to_string(), |h| h.as_hex().chars().take(12).collect())
}
