//! # stack-model
//!
//! In-memory model of a stack and its persisted build manifest.
//!
//! Handles:
//! - **Dependencies**: validated, immutable layer declarations built fluently.
//! - **Bases**: the canonical `min`/`base`/`full` distributions.
//! - **Files**: loose files copied on top of every layer.
//! - **Records**: what a previous build placed on disk.
//! - **Descriptors**: loading and validating JSON/YAML stack descriptions.
//! - **Manifest**: the `.stack.json` file round-tripped between builds.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod base;
pub mod dependency;
pub mod descriptor;
pub mod file;
pub mod loader;
pub mod manifest;
pub mod record;
pub mod validator;
