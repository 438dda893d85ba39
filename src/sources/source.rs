//! Fetcher trait - common interface for all input sources.

use std::path::Path;

use anyhow::Result;

/// What a fetch pinned down besides the content itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Exact revision (git commit) when the source has one
    pub rev: Option<String>,
}

/// A source of input content.
pub trait Fetcher {
    /// Get the source name for display.
    fn name(&self) -> &str;

    /// Whether fetching needs the network.
    fn is_remote(&self) -> bool;

    /// Materialize the content into `dest`, which does not exist yet.
    fn fetch(&mut self, dest: &Path) -> Result<FetchOutcome>;
}
