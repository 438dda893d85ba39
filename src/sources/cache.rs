//! Content-addressed snapshot store.
//!
//! Every fetched input ends up in `<cache>/snapshots/<hex>`, where `<hex>` is the
//! tree hash of its content. Identical content always shares one directory.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::locator::Locator;
use crate::sources::{Fetcher, GitFetcher, PathFetcher, TarballFetcher};
use crate::util::fs;
use crate::util::hash::{sha256_tree, HASH_PREFIX};

/// A resolved, immutable input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Content hash, `sha256-<hex>`
    pub nar_hash: String,

    /// Exact revision, for git inputs
    pub rev: Option<String>,

    /// Local directory holding the content
    pub path: PathBuf,
}

impl Snapshot {
    /// The snapshot identifier.
    pub fn id(&self) -> &str {
        &self.nar_hash
    }
}

/// Manages fetched snapshots.
pub struct SnapshotStore {
    /// Cache root (git clones live beside the snapshots)
    cache_dir: PathBuf,

    /// Refuse network fetches
    offline: bool,
}

impl SnapshotStore {
    /// Create a new snapshot store.
    pub fn new(cache_dir: PathBuf) -> Self {
        SnapshotStore {
            cache_dir,
            offline: false,
        }
    }

    /// Forbid network access.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Get the cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn snapshots_dir(&self) -> PathBuf {
        self.cache_dir.join("snapshots")
    }

    /// Create the fetcher for a locator.
    ///
    /// Relative path locators are resolved against `base`.
    pub fn fetcher_for(&self, locator: &Locator, base: &Path) -> Result<Box<dyn Fetcher>> {
        match locator {
            Locator::Path { .. } => {
                let path = locator
                    .resolve_path(base)
                    .ok_or_else(|| anyhow::anyhow!("path locator missing path"))?;
                Ok(Box::new(PathFetcher::new(path)))
            }
            Locator::Git { url, reference } => Ok(Box::new(GitFetcher::new(
                url.clone(),
                reference.clone(),
                &self.cache_dir,
            ))),
            Locator::Tarball { url } => Ok(Box::new(TarballFetcher::new(url.clone()))),
        }
    }

    /// Look up a snapshot by content hash without fetching.
    pub fn lookup(&self, nar_hash: &str) -> Option<PathBuf> {
        let hex = nar_hash.strip_prefix(HASH_PREFIX)?;
        let path = self.snapshots_dir().join(hex);
        path.is_dir().then_some(path)
    }

    /// Fetch through `fetcher` and import the result.
    pub fn import(&self, fetcher: &mut dyn Fetcher) -> Result<Snapshot> {
        if self.offline && fetcher.is_remote() {
            bail!("network access is disabled (offline mode) and no cached snapshot exists");
        }

        let snapshots = self.snapshots_dir();
        fs::ensure_dir(&snapshots)?;

        let staging = tempfile::Builder::new()
            .prefix(".fetch-")
            .tempdir_in(&snapshots)
            .with_context(|| format!("failed to create staging dir in {}", snapshots.display()))?;
        let content = staging.path().join("content");

        let outcome = fetcher.fetch(&content)?;
        let hex = sha256_tree(&content)?;
        let dest = snapshots.join(&hex);

        if dest.is_dir() {
            tracing::debug!("Snapshot {} already cached", hex);
        } else {
            fs::move_dir(&content, &dest)?;
        }

        Ok(Snapshot {
            nar_hash: format!("{}{}", HASH_PREFIX, hex),
            rev: outcome.rev,
            path: dest,
        })
    }
}
