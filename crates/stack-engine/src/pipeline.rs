//! Concurrent resolution feeding sequential application.
//!
//! Workers claim layer indices from a shared counter and send each
//! resolution result, tagged with its index, through one channel. The
//! consumer buffers early arrivals and hands results to `apply` strictly
//! in index order, so no layer is applied before every lower-indexed layer.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;

use stack_artifact::resolver::{ArtifactResolver, ResolvedArtifact};
use stack_common::error::{Result, StackError};
use stack_model::dependency::StackDependency;

use crate::layer::resolve_local_file;

/// What went wrong in [`resolve_in_order`], with the index it applies to.
#[derive(Debug)]
pub struct PipelineError<E> {
    /// Index of the layer being resolved or applied.
    pub index: usize,
    /// The failure.
    pub error: PipelineFailure<E>,
}

/// Cause of a [`PipelineError`].
#[derive(Debug)]
pub enum PipelineFailure<E> {
    /// The resolver failed for this layer.
    Resolve(StackError),
    /// `apply` failed for this layer.
    Apply(E),
    /// The cancel flag was raised before this layer was applied.
    Cancelled,
}

/// Resolves `layers` with up to `concurrency` workers and applies them in
/// order.
///
/// The first failure stops the workers; results that arrive afterwards
/// are discarded. The cancel flag is checked before every application.
///
/// # Errors
///
/// Returns the index and cause of the first failure in application order.
pub fn resolve_in_order<E, F>(
    resolver: &dyn ArtifactResolver,
    layers: &[StackDependency],
    concurrency: usize,
    cancel: &AtomicBool,
    mut apply: F,
) -> std::result::Result<(), PipelineError<E>>
where
    F: FnMut(usize, ResolvedArtifact) -> std::result::Result<(), E>,
{
    if layers.is_empty() {
        return Ok(());
    }
    let workers = concurrency.clamp(1, layers.len());
    let next = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel::<(usize, Result<ResolvedArtifact>)>();

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let (next, stop) = (&next, &stop);
            let _ = scope.spawn(move || {
                loop {
                    if stop.load(Ordering::SeqCst) || cancel.load(Ordering::SeqCst) {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(layer) = layers.get(index) else {
                        break;
                    };
                    if tx.send((index, resolve_local_file(resolver, layer))).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        let outcome = consume(&rx, layers.len(), cancel, &mut apply);
        stop.store(true, Ordering::SeqCst);
        drop(rx);
        outcome
    })
}

fn consume<E, F>(
    rx: &mpsc::Receiver<(usize, Result<ResolvedArtifact>)>,
    total: usize,
    cancel: &AtomicBool,
    apply: &mut F,
) -> std::result::Result<(), PipelineError<E>>
where
    F: FnMut(usize, ResolvedArtifact) -> std::result::Result<(), E>,
{
    let mut pending = BTreeMap::new();
    let mut expected = 0;

    for (index, result) in rx {
        let _ = pending.insert(index, result);
        while let Some(result) = pending.remove(&expected) {
            if cancel.load(Ordering::SeqCst) {
                return Err(PipelineError {
                    index: expected,
                    error: PipelineFailure::Cancelled,
                });
            }
            let resolved = result.map_err(|e| PipelineError {
                index: expected,
                error: PipelineFailure::Resolve(e),
            })?;
            apply(expected, resolved).map_err(|e| PipelineError {
                index: expected,
                error: PipelineFailure::Apply(e),
            })?;
            expected += 1;
        }
    }

    // Workers only stop early when cancelled.
    if expected < total {
        return Err(PipelineError {
            index: expected,
            error: PipelineFailure::Cancelled,
        });
    }
    Ok(())
}
