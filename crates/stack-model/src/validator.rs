//! Semantic checks run on a descriptor before any I/O.
//!
//! Checks for layers that would share an install record and for
//! conflicting layer ids.

use std::collections::HashSet;

use stack_common::error::{Result, StackError};

use crate::descriptor::StackDescriptor;

/// Validates a loaded descriptor for semantic correctness.
///
/// # Checks performed
///
/// 1. No two layers (base included) share a version-less coordinate key,
///    since a record could not tell them apart.
/// 2. No two layers share an id.
///
/// # Errors
///
/// Returns `StackError::Config` describing the first failing check.
pub fn validate(descriptor: &StackDescriptor) -> Result<()> {
    tracing::debug!(directory = %descriptor.directory.display(), "validating stack descriptor");
    check_duplicate_layers(descriptor)?;
    check_duplicate_ids(descriptor)?;
    Ok(())
}

fn check_duplicate_layers(descriptor: &StackDescriptor) -> Result<()> {
    let mut seen = HashSet::new();
    for (_, layer) in descriptor.layers() {
        let key = layer.coordinate().key();
        if !seen.insert(key.clone()) {
            return Err(StackError::config(format!(
                "artifact \"{key}\" is declared more than once"
            )));
        }
    }
    Ok(())
}

fn check_duplicate_ids(descriptor: &StackDescriptor) -> Result<()> {
    let mut seen = HashSet::new();
    for id in descriptor.layers().filter_map(|(_, layer)| layer.id()) {
        if !seen.insert(id) {
            return Err(StackError::config(format!(
                "dependency id \"{id}\" is used more than once"
            )));
        }
    }
    Ok(())
}
