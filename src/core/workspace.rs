//! Workspace - central configuration hub.
//!
//! A Workspace represents the project manifest and its on-disk layout,
//! providing centralized access to paths and settings.

use std::path::{Path, PathBuf};

use anyhow::Result;
use thiserror::Error;

use crate::core::manifest::Manifest;
use crate::util::config::Config;
use crate::util::GlobalContext;

/// Canonical manifest file name.
pub const MANIFEST_NAME: &str = "Berth.toml";

/// Accepted alias for the manifest file name.
pub const MANIFEST_ALIAS: &str = "berth.toml";

/// Lockfile name.
pub const LOCKFILE_NAME: &str = "Berth.lock";

/// Error locating a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("could not find Berth.toml in `{}` or any parent directory", dir.display())]
    NotFound { dir: PathBuf },
}

/// Find the manifest in `dir`, preferring the canonical name.
pub fn find_manifest(dir: &Path) -> Option<PathBuf> {
    [MANIFEST_NAME, MANIFEST_ALIAS]
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Find the lockfile belonging to a manifest directory.
pub fn find_lockfile(dir: &Path) -> Option<PathBuf> {
    let path = dir.join(LOCKFILE_NAME);
    path.is_file().then_some(path)
}

/// A project rooted at a manifest.
#[derive(Debug)]
pub struct Workspace {
    /// The project manifest
    manifest: Manifest,

    /// Path to the manifest file
    manifest_path: PathBuf,

    /// Directory containing the manifest
    root: PathBuf,

    /// Merged global and project configuration
    config: Config,

    /// Snapshot cache location
    cache_dir: PathBuf,

    /// Refuse network fetches
    offline: bool,
}

impl Workspace {
    /// Create a new workspace from a manifest path.
    pub fn new(manifest_path: &Path, ctx: &GlobalContext) -> Result<Self> {
        let manifest = Manifest::load(manifest_path)?;
        let root = manifest.manifest_dir().to_path_buf();

        let config = ctx.load_config(&root);
        let offline = ctx.is_offline() || config.net.offline;

        Ok(Workspace {
            manifest,
            manifest_path: manifest_path.to_path_buf(),
            root,
            config,
            cache_dir: ctx.cache_dir(),
            offline,
        })
    }

    /// Use a different snapshot cache.
    pub fn with_cache_dir(mut self, cache_dir: PathBuf) -> Self {
        self.cache_dir = cache_dir;
        self
    }

    /// Get the project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Get the manifest path.
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Get the lockfile path.
    pub fn lockfile_path(&self) -> PathBuf {
        self.root.join(LOCKFILE_NAME)
    }

    /// Get the effective configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the snapshot cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Check if network access is disabled.
    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Store directory that default package prefixes live under.
    pub fn store_dir(&self) -> PathBuf {
        self.config.store_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_workspace(dir: &Path, name: &str) -> PathBuf {
        let manifest_path = dir.join(name);
        std::fs::write(
            &manifest_path,
            r#"
[project]
name = "testws"

[inputs]
nixpkgs = "path:pkgs"
"#,
        )
        .unwrap();
        manifest_path
    }

    #[test]
    fn test_workspace_creation() {
        let tmp = TempDir::new().unwrap();
        let manifest_path = create_test_workspace(tmp.path(), MANIFEST_NAME);
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();

        let ws = Workspace::new(&manifest_path, &ctx).unwrap();
        assert_eq!(ws.manifest().name(), "testws");
        assert_eq!(ws.root(), tmp.path());
        assert!(ws.lockfile_path().ends_with("Berth.lock"));
        assert_eq!(ws.store_dir(), PathBuf::from("/nix/store"));
    }

    #[test]
    fn test_find_manifest_prefers_canonical() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(find_manifest(tmp.path()), None);

        create_test_workspace(tmp.path(), MANIFEST_ALIAS);
        assert_eq!(
            find_manifest(tmp.path()),
            Some(tmp.path().join(MANIFEST_ALIAS))
        );

        // On case-insensitive filesystems both names are the same file
        create_test_workspace(tmp.path(), MANIFEST_NAME);
        let found = find_manifest(tmp.path()).unwrap();
        assert!(found.ends_with(MANIFEST_NAME));
    }

    #[test]
    fn test_find_lockfile() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(find_lockfile(tmp.path()), None);
        std::fs::write(tmp.path().join(LOCKFILE_NAME), "version = 1\n").unwrap();
        assert!(find_lockfile(tmp.path()).is_some());
    }
}
