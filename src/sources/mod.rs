//! Input sources.
//!
//! Sources are responsible for fetching input content from various locations
//! (local paths, git repositories, tarballs) into the snapshot store.

pub mod cache;
pub mod git;
pub mod path;
pub mod source;
pub mod tarball;

pub use cache::{Snapshot, SnapshotStore};
pub use git::GitFetcher;
pub use path::PathFetcher;
pub use source::{FetchOutcome, Fetcher};
pub use tarball::TarballFetcher;
