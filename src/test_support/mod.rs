//! Test utilities for Berth unit tests.
//!
//! Inputs in tests are plain directories referenced with `path:` locators, so
//! resolution runs end to end without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use berth::test_support::{write_tree, TestInputs};
//!
//! #[test]
//! fn test_example() {
//!     let tmp = tempfile::TempDir::new().unwrap();
//!     let inputs = TestInputs::new(tmp.path());
//!     inputs.package_repo("pkgs", &["rustfmt"]);
//!     write_tree(tmp.path(), &[("Berth.toml", "[inputs]\nnixpkgs = \"path:pkgs\"\n")]);
//!     let set = inputs.resolve();
//! }
//! ```

pub mod fixtures;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use fixtures::*;

use crate::core::manifest::Manifest;
use crate::core::workspace::MANIFEST_NAME;
use crate::resolver::{InputNode, InputResolver, InputSet, ROOT_NODE};
use crate::sources::SnapshotStore;

/// Write `(relative path, content)` pairs under `root`, creating directories.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
    }
}

/// Builder for input directories under a test root.
#[derive(Debug, Clone)]
pub struct TestInputs {
    root: PathBuf,
}

impl TestInputs {
    pub fn new(root: &Path) -> Self {
        TestInputs {
            root: root.to_path_buf(),
        }
    }

    /// A package repository whose catalog lists `packages` at version 1.0.
    pub fn package_repo(&self, name: &str, packages: &[&str]) -> PathBuf {
        let dir = self.root.join(name);
        write_tree(&dir, &[("packages.toml", &catalog(packages))]);
        dir
    }

    /// A systems input listing `systems`.
    pub fn systems(&self, name: &str, systems: &[&str]) -> PathBuf {
        let dir = self.root.join(name);
        write_tree(&dir, &[("systems.toml", &systems_file(systems))]);
        dir
    }

    /// Resolve the `Berth.toml` at the test root, with a cache beside it.
    pub fn resolve(&self) -> InputSet {
        let manifest = Manifest::load(&self.root.join(MANIFEST_NAME)).unwrap();
        let store = SnapshotStore::new(self.root.join(".cache"));
        InputResolver::new(&store).resolve(&manifest).unwrap()
    }

    /// An input set with no inputs.
    pub fn empty_set() -> InputSet {
        let mut nodes = BTreeMap::new();
        nodes.insert(ROOT_NODE.to_string(), InputNode::root());
        InputSet::new(nodes, Vec::new())
    }
}
