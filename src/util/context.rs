//! Global context for Berth operations.
//!
//! Provides centralized access to configuration, paths, and environment.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use crate::core::workspace::{find_manifest as ws_find_manifest, ManifestError};
use crate::util::config::{global_config_path, load_config, project_config_path, Config};

/// Environment variable overriding the snapshot cache location.
pub const CACHE_DIR_ENV: &str = "BERTH_CACHE_DIR";

/// Project directories for Berth
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("dev", "berth", "berth"));

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Cache root for snapshots and git clones
    cache_dir: PathBuf,

    /// Whether to use verbose output
    verbose: bool,

    /// Whether network access was disabled on the command line
    offline: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let cache_dir = match std::env::var_os(CACHE_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => match PROJECT_DIRS.as_ref() {
                Some(dirs) => dirs.cache_dir().to_path_buf(),
                None => directories::BaseDirs::new()
                    .map(|b| b.home_dir().join(".berth").join("cache"))
                    .unwrap_or_else(|| PathBuf::from(".berth").join("cache")),
            },
        };

        Ok(GlobalContext {
            cwd,
            cache_dir,
            verbose: false,
            offline: false,
        })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Set verbose mode.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Disable network access.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the snapshot cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone()
    }

    /// Check if verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if offline mode was requested.
    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Load the configuration for a project rooted at `project_root`.
    pub fn load_config(&self, project_root: &Path) -> Config {
        load_config(
            global_config_path().as_deref(),
            &project_config_path(project_root),
        )
    }

    /// Find the manifest file starting from cwd and searching upward.
    pub fn find_manifest(&self) -> Result<PathBuf, ManifestError> {
        let mut current = self.cwd.clone();
        loop {
            if let Some(path) = ws_find_manifest(&current) {
                return Ok(path);
            }
            if !current.pop() {
                return Err(ManifestError::NotFound {
                    dir: self.cwd.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_paths() {
        let ctx = GlobalContext::new().unwrap();
        assert!(ctx.cwd().is_absolute());
        assert!(!ctx.is_offline());
    }

    #[test]
    fn test_find_manifest_searches_upward() {
        let tmp = TempDir::new().unwrap();
        let manifest = tmp.path().join("Berth.toml");
        std::fs::write(&manifest, "[inputs]\n").unwrap();
        let nested = tmp.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        let ctx = GlobalContext::with_cwd(nested).unwrap();
        assert_eq!(ctx.find_manifest().ok(), Some(manifest));
    }

    #[test]
    fn test_find_manifest_not_found() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();
        // A manifest may exist somewhere above the tempdir; only assert the
        // error shape when nothing is found.
        if let Err(err) = ctx.find_manifest() {
            assert!(matches!(err, ManifestError::NotFound { .. }));
            assert!(err.to_string().contains("Berth.toml"));
        }
    }
}
