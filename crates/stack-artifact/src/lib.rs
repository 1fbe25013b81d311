//! # stack-artifact
//!
//! Artifact handling for the stack builder.
//!
//! Handles:
//! - **Hashing**: SHA-256 fingerprints and checksum sidecars.
//! - **Archives**: `zip`, `tar` and `tar.gz` extraction with path stripping.
//! - **Layout**: repository paths derived from coordinates.
//! - **Resolvers**: local repository, remote repository and chained lookup.
//! - **Storage**: the local download cache for remote artifacts.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod archive;
pub mod hash;
pub mod layout;
pub mod remote;
pub mod repository;
pub mod resolver;
pub mod storage;
