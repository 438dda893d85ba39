//! Path source - inputs from local directories.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::sources::source::{FetchOutcome, Fetcher};
use crate::util::fs;

/// A source for local directory inputs.
pub struct PathFetcher {
    /// Directory to snapshot
    path: PathBuf,

    /// Display name
    name: String,
}

impl PathFetcher {
    /// Create a new path source.
    pub fn new(path: PathBuf) -> Self {
        let name = path.display().to_string();
        PathFetcher { path, name }
    }
}

impl Fetcher for PathFetcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_remote(&self) -> bool {
        false
    }

    fn fetch(&mut self, dest: &Path) -> Result<FetchOutcome> {
        if !self.path.is_dir() {
            bail!("directory does not exist: {}", self.path.display());
        }

        tracing::debug!("Copying {}", self.path.display());
        fs::copy_dir_all(&self.path, dest)?;

        Ok(FetchOutcome::default())
    }
}
