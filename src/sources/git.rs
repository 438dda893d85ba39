//! Git source - inputs from git repositories.
//!
//! Repositories are kept as bare clones under `<cache>/git/`; a fetch exports
//! the tree of the selected commit, so snapshots never contain `.git`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use git2::{Commit, ObjectType, Oid, Repository, TreeWalkMode, TreeWalkResult};
use url::Url;

use crate::core::locator::GitReference;
use crate::sources::source::{FetchOutcome, Fetcher};
use crate::util::fs;
use crate::util::hash::sha256_str;

/// A source for git inputs.
pub struct GitFetcher {
    /// Remote repository URL
    remote: Url,

    /// Git reference (ref or rev)
    reference: GitReference,

    /// Bare clone location
    repo_path: PathBuf,

    /// Display name
    name: String,
}

impl GitFetcher {
    /// Create a new git source.
    pub fn new(remote: Url, reference: GitReference, cache_dir: &Path) -> Self {
        // Unique directory per remote; references share the clone
        let dir_name = format!(
            "{}-{}",
            sanitize_url_for_path(&remote),
            &sha256_str(remote.as_str())[..8]
        );
        let repo_path = cache_dir.join("git").join(dir_name);
        let name = remote.to_string();

        GitFetcher {
            remote,
            reference,
            repo_path,
            name,
        }
    }

    fn open_or_clone(&self) -> Result<(Repository, bool)> {
        if self.repo_path.exists() {
            let repo = Repository::open_bare(&self.repo_path).with_context(|| {
                format!("failed to open git cache: {}", self.repo_path.display())
            })?;
            return Ok((repo, false));
        }

        tracing::info!("Cloning {}", self.remote);
        fs::ensure_dir(self.repo_path.parent().unwrap_or(Path::new(".")))?;

        let repo = git2::build::RepoBuilder::new()
            .bare(true)
            .clone(self.remote.as_str(), &self.repo_path)
            .with_context(|| format!("failed to clone {}", self.remote))?;
        Ok((repo, true))
    }

    fn update(&self, repo: &Repository) -> Result<()> {
        tracing::info!("Updating {}", self.remote);

        let mut remote = repo
            .find_remote("origin")
            .or_else(|_| repo.remote_anonymous(self.remote.as_str()))?;
        remote
            .fetch(
                &["+refs/heads/*:refs/heads/*", "+refs/tags/*:refs/tags/*"],
                None,
                None,
            )
            .with_context(|| format!("failed to fetch {}", self.remote))?;
        Ok(())
    }

    fn find_commit<'r>(&self, repo: &'r Repository) -> Result<Commit<'r>> {
        let commit = match &self.reference {
            GitReference::DefaultBranch => repo.head()?.peel_to_commit()?,
            GitReference::Ref(name) => {
                let candidates = [
                    format!("refs/heads/{}", name),
                    format!("refs/tags/{}", name),
                    format!("refs/remotes/origin/{}", name),
                ];
                let found = candidates
                    .iter()
                    .find_map(|r| repo.find_reference(r).ok());
                match found {
                    Some(reference) => reference.peel_to_commit()?,
                    None => bail!("no branch or tag named `{}` in {}", name, self.remote),
                }
            }
            GitReference::Rev(rev) => {
                let oid = Oid::from_str(rev)
                    .with_context(|| format!("invalid git revision `{}`", rev))?;
                repo.find_commit(oid)?
            }
        };
        Ok(commit)
    }

    /// Resolve the reference to a commit, fetching only when needed.
    fn resolve<'r>(&self, repo: &'r Repository, fresh_clone: bool) -> Result<Commit<'r>> {
        // A cached exact rev never needs the network; symbolic refs may have moved.
        let may_use_cache = matches!(self.reference, GitReference::Rev(_)) || fresh_clone;
        if may_use_cache {
            if let Ok(commit) = self.find_commit(repo) {
                return Ok(commit);
            }
        }
        if !fresh_clone {
            self.update(repo)?;
        }
        self.find_commit(repo)
    }
}

impl Fetcher for GitFetcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_remote(&self) -> bool {
        self.remote.scheme() != "file"
    }

    fn fetch(&mut self, dest: &Path) -> Result<FetchOutcome> {
        let (repo, fresh_clone) = self.open_or_clone()?;
        let commit = self.resolve(&repo, fresh_clone)?;
        let rev = commit.id().to_string();

        tracing::debug!("Exporting {} at {}", self.remote, rev);
        export_tree(&repo, &commit, dest)?;

        Ok(FetchOutcome { rev: Some(rev) })
    }
}

/// Write the tree of `commit` into `dest`.
fn export_tree(repo: &Repository, commit: &Commit<'_>, dest: &Path) -> Result<()> {
    let tree = commit.tree()?;

    // Collect first: the walk callback cannot propagate errors.
    let mut entries: Vec<(PathBuf, Oid, i32, Option<ObjectType>)> = Vec::new();
    tree.walk(TreeWalkMode::PreOrder, |root, entry| {
        let name = entry.name().unwrap_or_default();
        entries.push((
            PathBuf::from(root).join(name),
            entry.id(),
            entry.filemode(),
            entry.kind(),
        ));
        TreeWalkResult::Ok
    })?;

    fs::ensure_dir(dest)?;
    for (rel, oid, mode, kind) in entries {
        let path = dest.join(&rel);
        match kind {
            Some(ObjectType::Tree) => fs::ensure_dir(&path)?,
            Some(ObjectType::Blob) => {
                let blob = repo.find_blob(oid)?;
                if mode == 0o120000 {
                    let target = String::from_utf8_lossy(blob.content()).into_owned();
                    fs::symlink(Path::new(&target), &path)
                        .with_context(|| format!("failed to create {}", path.display()))?;
                } else {
                    std::fs::write(&path, blob.content())
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    if mode == 0o100755 {
                        fs::set_executable(&path)?;
                    }
                }
            }
            Some(ObjectType::Commit) => {
                tracing::warn!("skipping git submodule at {}", rel.display());
            }
            _ => {}
        }
    }
    Ok(())
}

/// Sanitize a URL for use as a directory name.
fn sanitize_url_for_path(url: &Url) -> String {
    let mut name = String::new();

    if let Some(host) = url.host_str() {
        name.push_str(host);
    }

    let path = url.path().trim_matches('/');
    if !path.is_empty() {
        if !name.is_empty() {
            name.push('-');
        }
        name.push_str(&path.replace('/', "-"));
    }

    // Remove .git suffix
    if name.ends_with(".git") {
        name.truncate(name.len() - 4);
    }

    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn commit_file(repo: &Repository, path: &str, content: &str, message: &str) -> Oid {
        let workdir = repo.workdir().unwrap().to_path_buf();
        std::fs::write(workdir.join(path), content).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(path)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();

        let parents: Vec<Commit<'_>> = match repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => vec![],
        };
        let parent_refs: Vec<&Commit<'_>> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
    }

    #[test]
    fn test_sanitize_url() {
        let url = Url::parse("https://github.com/user/repo.git").unwrap();
        assert_eq!(sanitize_url_for_path(&url), "github.com-user-repo");

        let url2 = Url::parse("file:///srv/repos/systems").unwrap();
        assert_eq!(sanitize_url_for_path(&url2), "srv-repos-systems");
    }

    #[test]
    fn test_fetch_default_branch_and_pinned_rev() {
        let tmp = TempDir::new().unwrap();
        let origin_path = tmp.path().join("origin");
        let origin = Repository::init(&origin_path).unwrap();
        let first = commit_file(&origin, "systems.toml", "systems = []\n", "first");
        let second = commit_file(
            &origin,
            "systems.toml",
            "systems = [\"x86_64-linux\"]\n",
            "second",
        );

        let url = Url::from_file_path(&origin_path).unwrap();
        let cache = tmp.path().join("cache");

        let mut head = GitFetcher::new(url.clone(), GitReference::DefaultBranch, &cache);
        assert!(!head.is_remote());
        let dest = tmp.path().join("head");
        let outcome = head.fetch(&dest).unwrap();
        assert_eq!(outcome.rev, Some(second.to_string()));
        assert!(std::fs::read_to_string(dest.join("systems.toml"))
            .unwrap()
            .contains("x86_64-linux"));
        assert!(!dest.join(".git").exists());

        let mut pinned = GitFetcher::new(url, GitReference::Rev(first.to_string()), &cache);
        let dest = tmp.path().join("pinned");
        let outcome = pinned.fetch(&dest).unwrap();
        assert_eq!(outcome.rev, Some(first.to_string()));
        assert_eq!(
            std::fs::read_to_string(dest.join("systems.toml")).unwrap(),
            "systems = []\n"
        );
    }

    #[test]
    fn test_fetch_unknown_ref_fails() {
        let tmp = TempDir::new().unwrap();
        let origin_path = tmp.path().join("origin");
        let origin = Repository::init(&origin_path).unwrap();
        commit_file(&origin, "a.txt", "a", "init");

        let url = Url::from_file_path(&origin_path).unwrap();
        let mut fetcher = GitFetcher::new(
            url,
            GitReference::Ref("no-such-branch".into()),
            &tmp.path().join("cache"),
        );
        let err = fetcher.fetch(&tmp.path().join("out")).unwrap_err();
        assert!(err.to_string().contains("no-such-branch"));
    }
}
