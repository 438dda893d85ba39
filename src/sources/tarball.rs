//! Tarball source - inputs from gzipped tarballs over HTTP(S).

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;
use url::Url;

use crate::sources::source::{FetchOutcome, Fetcher};
use crate::util::fs;

/// Download timeout for a single tarball.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// A source for tarball inputs.
pub struct TarballFetcher {
    url: Url,
    name: String,
}

impl TarballFetcher {
    /// Create a new tarball source.
    pub fn new(url: Url) -> Self {
        let name = url.to_string();
        TarballFetcher { url, name }
    }

    fn download(&self) -> Result<Vec<u8>> {
        tracing::info!("Downloading {}", self.url);

        let client = reqwest::blocking::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;
        let response = client
            .get(self.url.as_str())
            .send()
            .with_context(|| format!("failed to download {}", self.url))?;

        if !response.status().is_success() {
            bail!("download of {} failed: HTTP {}", self.url, response.status());
        }

        let bytes = response
            .bytes()
            .with_context(|| format!("failed to read body of {}", self.url))?;
        Ok(bytes.to_vec())
    }
}

impl Fetcher for TarballFetcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_remote(&self) -> bool {
        true
    }

    fn fetch(&mut self, dest: &Path) -> Result<FetchOutcome> {
        let bytes = self.download()?;
        unpack_tarball(&bytes, dest)
            .with_context(|| format!("failed to unpack {}", self.url))?;
        Ok(FetchOutcome::default())
    }
}

/// Unpack a `.tar.gz` into `dest`.
///
/// Archives with a single top-level directory (the usual `project-1.2/` layout)
/// have that directory stripped.
pub fn unpack_tarball(bytes: &[u8], dest: &Path) -> Result<()> {
    let staging = dest.with_extension("unpack");
    fs::remove_dir_all_if_exists(&staging)?;
    fs::ensure_dir(&staging)?;

    let mut archive = Archive::new(GzDecoder::new(bytes));
    archive.set_preserve_permissions(true);
    archive.unpack(&staging)?;

    let top: Vec<_> = std::fs::read_dir(&staging)?.collect::<std::io::Result<_>>()?;
    let root = if top.len() == 1 && top[0].file_type()?.is_dir() {
        top[0].path()
    } else {
        staging.clone()
    };

    fs::move_dir(&root, dest)?;
    fs::remove_dir_all_if_exists(&staging)
}
