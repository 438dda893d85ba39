//! Core data structures for Berth.
//!
//! This module contains the foundational types used throughout Berth:
//! - Platform identifiers and input locators
//! - Manifests and their sections
//! - Package sets instantiated per platform
//! - Workspace management

pub mod locator;
pub mod manifest;
pub mod package_set;
pub mod platform;
pub mod workspace;

pub use locator::Locator;
pub use manifest::Manifest;
pub use package_set::{Package, PackageSet};
pub use platform::Platform;
pub use workspace::{
    find_lockfile, find_manifest, ManifestError, Workspace, LOCKFILE_NAME, MANIFEST_ALIAS,
    MANIFEST_NAME,
};
