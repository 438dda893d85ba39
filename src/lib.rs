//! Berth - reproducible development environments
//!
//! This crate provides the core library functionality for Berth: pinning a
//! project's inputs into a lockfile, enumerating its target platforms, and
//! composing a formatter pipeline and dev shells for each of them.

pub mod compose;
pub mod core;
pub mod eval;
pub mod ops;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test utilities for Berth unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides fake package repositories, systems inputs
/// and formatter engine scripts.
#[cfg(test)]
pub mod test_support;

pub use core::{manifest::Manifest, platform::Platform, workspace::Workspace};

pub use eval::Outputs;
pub use resolver::InputSet;
pub use util::context::GlobalContext;
