//! Input locators - WHERE an input comes from.
//!
//! A locator is the string written in `Berth.toml` (`url = "..."`). It is parsed
//! once into a [`Locator`] and printed back in canonical form for the lockfile.
//!
//! Accepted forms:
//! - `path:../shared` (relative to the manifest directory)
//! - `git+https://example.com/repo.git?ref=main&rev=<sha>`
//! - `github:owner/repo/ref`
//! - `tarball+https://example.com/src.tar.gz`, or any `http(s)` URL ending in `.tar.gz`/`.tgz`

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{anyhow, bail, Result};
use regex::Regex;
use url::Url;

static GITHUB_SHORTHAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^github:([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)(?:/([^?]+))?(?:\?(.*))?$")
        .expect("github shorthand regex is valid")
});

/// Git reference specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum GitReference {
    /// Remote HEAD
    #[default]
    DefaultBranch,
    /// Branch or tag name
    Ref(String),
    /// Exact commit
    Rev(String),
}

/// A parsed input locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Local directory
    Path { path: PathBuf },
    /// Git repository
    Git { url: Url, reference: GitReference },
    /// Gzipped tarball over HTTP(S)
    Tarball { url: Url },
}

impl Locator {
    /// Parse a locator string.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if let Some(path) = s.strip_prefix("path:") {
            if path.is_empty() {
                bail!("path locator `{}` has an empty path", s);
            }
            return Ok(Locator::Path {
                path: PathBuf::from(path),
            });
        }

        if s.starts_with("github:") {
            return Self::parse_github(s);
        }

        if let Some(rest) = s.strip_prefix("git+") {
            let mut url = Url::parse(rest)?;
            let reference = match url.query() {
                Some(query) => parse_git_query(query),
                None => GitReference::DefaultBranch,
            };
            url.set_query(None);
            return Ok(Locator::Git { url, reference });
        }

        if let Some(rest) = s.strip_prefix("tarball+") {
            return Ok(Locator::Tarball {
                url: Url::parse(rest)?,
            });
        }

        if (s.starts_with("https://") || s.starts_with("http://"))
            && (s.ends_with(".tar.gz") || s.ends_with(".tgz"))
        {
            return Ok(Locator::Tarball { url: Url::parse(s)? });
        }

        bail!(
            "unrecognized locator `{}` (expected `path:`, `git+`, `github:` or `tarball+`)",
            s
        )
    }

    fn parse_github(s: &str) -> Result<Self> {
        let caps = GITHUB_SHORTHAND
            .captures(s)
            .ok_or_else(|| anyhow!("invalid github locator `{}`", s))?;

        let url = Url::parse(&format!("https://github.com/{}/{}", &caps[1], &caps[2]))?;

        let mut reference = match caps.get(3) {
            Some(r) => GitReference::Ref(r.as_str().to_string()),
            None => GitReference::DefaultBranch,
        };
        if let Some(query) = caps.get(4) {
            if let GitReference::Rev(rev) = parse_git_query(query.as_str()) {
                reference = GitReference::Rev(rev);
            }
        }

        Ok(Locator::Git { url, reference })
    }

    /// Check if this is a local path locator.
    pub fn is_path(&self) -> bool {
        matches!(self, Locator::Path { .. })
    }

    /// Check if this locator needs network access to resolve.
    pub fn is_remote(&self) -> bool {
        match self {
            Locator::Path { .. } => false,
            Locator::Git { url, .. } => url.scheme() != "file",
            Locator::Tarball { .. } => true,
        }
    }

    /// Resolve a relative path locator against a base directory.
    pub fn resolve_path(&self, base: &Path) -> Option<PathBuf> {
        match self {
            Locator::Path { path } if path.is_absolute() => Some(path.clone()),
            Locator::Path { path } => Some(base.join(path)),
            _ => None,
        }
    }

    /// Pin a git locator to an exact commit.
    ///
    /// Other locator kinds are returned unchanged.
    pub fn with_rev(&self, rev: impl Into<String>) -> Locator {
        match self {
            Locator::Git { url, .. } => Locator::Git {
                url: url.clone(),
                reference: GitReference::Rev(rev.into()),
            },
            other => other.clone(),
        }
    }

    /// Short kind name used in the lockfile.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Locator::Path { .. } => "path",
            Locator::Git { .. } => "git",
            Locator::Tarball { .. } => "tarball",
        }
    }

    /// Canonical string form.
    pub fn to_url_string(&self) -> String {
        match self {
            Locator::Path { path } => format!("path:{}", path.display()),
            Locator::Git { url, reference } => {
                let mut url = url.clone();
                match reference {
                    GitReference::DefaultBranch => {}
                    GitReference::Ref(r) => url.set_query(Some(&format!("ref={}", r))),
                    GitReference::Rev(r) => url.set_query(Some(&format!("rev={}", r))),
                }
                format!("git+{}", url)
            }
            Locator::Tarball { url } => format!("tarball+{}", url),
        }
    }
}

fn parse_git_query(query: &str) -> GitReference {
    let mut reference = GitReference::DefaultBranch;
    for param in query.split('&') {
        if let Some((key, value)) = param.split_once('=') {
            match key {
                // An exact rev always wins over a symbolic ref
                "rev" => return GitReference::Rev(value.to_string()),
                "ref" | "branch" | "tag" => reference = GitReference::Ref(value.to_string()),
                _ => {}
            }
        }
    }
    reference
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url_string())
    }
}
