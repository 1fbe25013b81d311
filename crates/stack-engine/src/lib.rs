//! # stack-engine
//!
//! Materializes a stack descriptor into a directory.
//!
//! Handles:
//! - **Engine**: the build state machine, from manifest loading to persisting.
//! - **Pipeline**: concurrent resolution feeding in-order application.
//! - **Layers**: extracting or copying one resolved artifact.
//! - **Plan**: what a build would do, without resolving anything.
//! - **Uninstall**: removing every file a manifest accounts for.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod cleanup;

pub mod engine;
pub mod error;
pub mod layer;
pub mod pipeline;
pub mod plan;
pub mod state;
pub mod uninstall;
