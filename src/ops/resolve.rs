//! Workspace resolution operations.

use anyhow::Result;

use crate::core::Workspace;
use crate::ops::lockfile::{compute_manifest_hash, load_lockfile, lockfile_needs_update, save_lockfile};
use crate::resolver::{InputResolver, InputSet, Lockfile, UpdatePolicy};
use crate::sources::SnapshotStore;
use crate::util::diagnostic::StaleLockfileError;

/// Options for resolving a workspace.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Which locked entries may be reused
    pub policy: UpdatePolicy,

    /// Fail instead of writing a changed lockfile
    pub locked: bool,

    /// Resolve, but never write the lockfile
    pub dry_run: bool,
}

/// Result of resolving a workspace.
#[derive(Debug)]
pub struct Resolution {
    /// The resolved input graph
    pub inputs: InputSet,

    /// Lockfile describing `inputs`
    pub lockfile: Lockfile,

    /// Lockfile that was on disk before resolution
    pub previous: Option<Lockfile>,

    /// Whether Berth.lock was (re)written
    pub written: bool,
}

impl Resolution {
    /// Check if resolution changed anything compared to the previous lockfile.
    pub fn changed(&self) -> bool {
        self.previous.as_ref() != Some(&self.lockfile)
    }
}

/// Open the snapshot store configured for a workspace.
pub fn snapshot_store(ws: &Workspace) -> SnapshotStore {
    SnapshotStore::new(ws.cache_dir().to_path_buf()).offline(ws.is_offline())
}

/// Resolve the workspace inputs with the default options.
pub fn resolve_workspace(ws: &Workspace) -> Result<InputSet> {
    Ok(resolve_workspace_with_opts(ws, &ResolveOptions::default())?.inputs)
}

/// Resolve the workspace inputs.
///
/// Locked entries are reused whenever their declared locator is unchanged, so
/// a stale lockfile only re-fetches the inputs that were actually edited. The
/// lockfile is rewritten when the result differs from what is on disk, unless
/// `locked` is set, in which case that is an error.
pub fn resolve_workspace_with_opts(ws: &Workspace, opts: &ResolveOptions) -> Result<Resolution> {
    let lockfile_path = ws.lockfile_path();
    let manifest = ws.manifest();

    let previous = load_lockfile(&lockfile_path)?;
    let stale = lockfile_needs_update(manifest, &lockfile_path)?;

    if opts.locked && stale && opts.policy == UpdatePolicy::Locked {
        return Err(StaleLockfileError.into());
    }

    match (&previous, stale) {
        (None, _) => tracing::info!("No lockfile found, resolving inputs"),
        (Some(_), true) => tracing::info!("Manifest changed, re-resolving inputs"),
        (Some(_), false) => tracing::debug!("Using existing lockfile (manifest unchanged)"),
    }

    let store = snapshot_store(ws);
    let reuse = match opts.policy {
        UpdatePolicy::All => None,
        _ => previous.as_ref(),
    };
    let inputs = InputResolver::new(&store)
        .with_lockfile(reuse)
        .with_policy(opts.policy.clone())
        .resolve(manifest)?;

    for id in inputs.unreachable() {
        tracing::debug!("Node `{}` is not reachable from the project", id);
    }

    let lockfile = Lockfile::from_input_set(&inputs).with_manifest_hash(compute_manifest_hash(manifest)?);
    let differs = previous.as_ref() != Some(&lockfile);

    let mut written = false;
    if differs {
        if opts.locked {
            return Err(StaleLockfileError.into());
        }
        if !opts.dry_run {
            save_lockfile(&lockfile_path, &inputs, manifest)?;
            written = true;
        }
    }

    Ok(Resolution {
        inputs,
        lockfile,
        previous,
        written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_tree, TestInputs};
    use crate::util::GlobalContext;
    use tempfile::TempDir;

    fn workspace(dir: &std::path::Path) -> Workspace {
        let inputs = TestInputs::new(dir);
        inputs.package_repo("pkgs", &["rustfmt"]);
        write_tree(dir, &[("Berth.toml", "[inputs]\nnixpkgs = \"path:pkgs\"\n")]);

        let ctx = GlobalContext::with_cwd(dir.to_path_buf()).unwrap();
        Workspace::new(&dir.join("Berth.toml"), &ctx)
            .unwrap()
            .with_cache_dir(dir.join(".cache"))
    }

    #[test]
    fn test_resolve_writes_lockfile() {
        let tmp = TempDir::new().unwrap();
        let ws = workspace(tmp.path());

        let resolution = resolve_workspace_with_opts(&ws, &ResolveOptions::default()).unwrap();
        assert!(resolution.written);
        assert!(resolution.previous.is_none());
        assert!(ws.lockfile_path().exists());
        assert_eq!(resolution.inputs.snapshot_count(), 1);
    }

    #[test]
    fn test_fresh_lockfile_is_left_alone() {
        let tmp = TempDir::new().unwrap();
        let ws = workspace(tmp.path());

        resolve_workspace(&ws).unwrap();
        let second = resolve_workspace_with_opts(&ws, &ResolveOptions::default()).unwrap();
        assert!(!second.written);
        assert!(!second.changed());
    }

    #[test]
    fn test_locked_without_lockfile_fails() {
        let tmp = TempDir::new().unwrap();
        let ws = workspace(tmp.path());

        let opts = ResolveOptions {
            locked: true,
            ..Default::default()
        };
        let err = resolve_workspace_with_opts(&ws, &opts).unwrap_err();
        assert!(err.downcast_ref::<StaleLockfileError>().is_some());
        assert!(!ws.lockfile_path().exists());
    }

    #[test]
    fn test_locked_with_fresh_lockfile_succeeds() {
        let tmp = TempDir::new().unwrap();
        let ws = workspace(tmp.path());
        resolve_workspace(&ws).unwrap();

        let opts = ResolveOptions {
            locked: true,
            ..Default::default()
        };
        assert!(resolve_workspace_with_opts(&ws, &opts).is_ok());
    }

    #[test]
    fn test_dry_run_does_not_write() {
        let tmp = TempDir::new().unwrap();
        let ws = workspace(tmp.path());

        let opts = ResolveOptions {
            dry_run: true,
            ..Default::default()
        };
        let resolution = resolve_workspace_with_opts(&ws, &opts).unwrap();
        assert!(!resolution.written);
        assert!(resolution.changed());
        assert!(!ws.lockfile_path().exists());
    }
}
