//! Input resolution.
//!
//! Turns the `[inputs]` of a manifest into an [`InputSet`]: every input fetched
//! exactly once into the snapshot store, transitive inputs discovered from the
//! snapshots' own `Berth.toml`, and follows aliases rewritten into edges before
//! anything is fetched so an aliased input never gets a second snapshot.

pub mod encode;
pub mod errors;
pub mod resolve;

pub use encode::Lockfile;
pub use errors::ResolveError;
pub use resolve::{InputEdge, InputNode, InputSet, ROOT_NODE};

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use crate::core::locator::Locator;
use crate::core::manifest::{InputDecl, Manifest};
use crate::core::workspace::MANIFEST_NAME;
use crate::sources::{Snapshot, SnapshotStore};

/// Maximum nesting of transitive inputs.
const MAX_DEPTH: usize = 16;

/// Which locked entries may be reused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Reuse every locked entry whose locator is unchanged
    #[default]
    Locked,
    /// Re-resolve the named top-level inputs, reuse the rest
    Inputs(BTreeSet<String>),
    /// Ignore the lockfile entirely
    All,
}

/// A node waiting to be fetched.
struct Pending {
    id: String,
    path: Vec<String>,
    decl: InputDecl,
    /// Directory relative path locators are resolved against
    base: PathBuf,
    /// Follows overrides for this node's own inputs, as absolute paths
    overrides: BTreeMap<String, Vec<String>>,
}

/// Resolves the input graph of a root manifest.
pub struct InputResolver<'a> {
    store: &'a SnapshotStore,
    lockfile: Option<&'a Lockfile>,
    policy: UpdatePolicy,
}

impl<'a> InputResolver<'a> {
    /// Create a new resolver backed by a snapshot store.
    pub fn new(store: &'a SnapshotStore) -> Self {
        InputResolver {
            store,
            lockfile: None,
            policy: UpdatePolicy::Locked,
        }
    }

    /// Reuse locked entries from a previous resolution.
    pub fn with_lockfile(mut self, lockfile: Option<&'a Lockfile>) -> Self {
        self.lockfile = lockfile;
        self
    }

    /// Set the update policy.
    pub fn with_policy(mut self, policy: UpdatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Resolve every input of `manifest`.
    pub fn resolve(&self, manifest: &Manifest) -> Result<InputSet, ResolveError> {
        if let UpdatePolicy::Inputs(names) = &self.policy {
            for name in names {
                if !manifest.inputs.contains_key(name) {
                    return Err(ResolveError::UnknownInput {
                        name: name.clone(),
                        available: manifest.inputs.keys().cloned().collect(),
                    });
                }
            }
        }

        let mut nodes: BTreeMap<String, InputNode> = BTreeMap::new();
        let mut used_ids: HashSet<String> = HashSet::new();
        used_ids.insert(ROOT_NODE.to_string());

        let mut root = InputNode::root();
        let mut queue = VecDeque::new();
        for (name, decl) in &manifest.inputs {
            let id = unique_id(name, &mut used_ids);
            root.inputs.insert(name.clone(), InputEdge::Node(id.clone()));
            queue.push_back(Pending {
                id,
                path: vec![name.clone()],
                decl: decl.clone(),
                base: manifest.manifest_dir().to_path_buf(),
                overrides: absolute_follows(&[], &decl.follows),
            });
        }
        nodes.insert(ROOT_NODE.to_string(), root);

        while let Some(pending) = queue.pop_front() {
            if pending.path.len() > MAX_DEPTH {
                return Err(ResolveError::UnresolvableSource {
                    input: pending.path.join("/"),
                    locator: pending.decl.url.clone(),
                    reason: format!("inputs nested deeper than {} levels", MAX_DEPTH),
                });
            }

            let (snapshot, locked) = self.materialize(&pending)?;
            let mut node = InputNode {
                id: pending.id.clone(),
                path: pending.path.clone(),
                original: Some(pending.decl.locator.clone()),
                locked: Some(locked),
                snapshot: None,
                inputs: BTreeMap::new(),
            };

            let nested = load_nested_manifest(&snapshot.path, &pending)?;
            let declared: BTreeSet<&String> = nested
                .as_ref()
                .map(|m| m.inputs.keys().collect())
                .unwrap_or_default();
            for name in pending.overrides.keys() {
                if !declared.contains(name) {
                    tracing::warn!(
                        "input `{}` has a follows for `{}`, which it does not declare",
                        pending.path.join("/"),
                        name
                    );
                }
            }

            // Relative paths inside a local input point next to its source,
            // not next to its snapshot copy.
            let nested_base = pending
                .decl
                .locator
                .resolve_path(&pending.base)
                .unwrap_or_else(|| snapshot.path.clone());

            if let Some(nested) = nested {
                for (name, decl) in &nested.inputs {
                    // Aliased inputs are never fetched
                    if let Some(target) = pending.overrides.get(name) {
                        node.inputs
                            .insert(name.clone(), InputEdge::Follows(target.clone()));
                        continue;
                    }

                    let id = unique_id(name, &mut used_ids);
                    node.inputs.insert(name.clone(), InputEdge::Node(id.clone()));
                    let mut path = pending.path.clone();
                    path.push(name.clone());
                    queue.push_back(Pending {
                        id,
                        path,
                        decl: decl.clone(),
                        base: nested_base.clone(),
                        overrides: absolute_follows(&pending.path, &decl.follows),
                    });
                }
            }

            tracing::debug!("Resolved {} to {}", pending.path.join("/"), snapshot.id());
            node.snapshot = Some(snapshot);
            nodes.insert(node.id.clone(), node);
        }

        let canonical = canonical_edges(&nodes)?;
        let set = InputSet::new(nodes, canonical);
        for orphan in set.unreachable() {
            tracing::warn!("input node `{}` is unreachable from the project", orphan);
        }
        Ok(set)
    }

    /// Fetch (or reuse) the snapshot for a pending node.
    fn materialize(&self, pending: &Pending) -> Result<(Snapshot, Locator), ResolveError> {
        let unresolvable = |reason: String| ResolveError::UnresolvableSource {
            input: pending.path.join("/"),
            locator: pending.decl.url.clone(),
            reason,
        };

        if let Some(locked) = self.locked_entry(pending) {
            let locator = locked
                .locator()
                .map_err(|e| ResolveError::InvalidLocator {
                    input: pending.path.join("/"),
                    locator: locked.url.clone(),
                    reason: format!("{:#}", e),
                })?;

            if let Some(path) = self.store.lookup(&locked.nar_hash) {
                return Ok((
                    Snapshot {
                        nar_hash: locked.nar_hash.clone(),
                        rev: locked.rev.clone(),
                        path,
                    },
                    locator,
                ));
            }

            let mut fetcher = self
                .store
                .fetcher_for(&locator, &pending.base)
                .map_err(|e| unresolvable(format!("{:#}", e)))?;
            let snapshot = self
                .store
                .import(fetcher.as_mut())
                .map_err(|e| unresolvable(format!("{:#}", e)))?;

            if snapshot.nar_hash != locked.nar_hash {
                return Err(unresolvable(format!(
                    "content hash mismatch: locked {}, fetched {}",
                    locked.nar_hash, snapshot.nar_hash
                )));
            }
            return Ok((snapshot, locator));
        }

        tracing::info!("Fetching {} ({})", pending.path.join("/"), pending.decl.url);
        let mut fetcher = self
            .store
            .fetcher_for(&pending.decl.locator, &pending.base)
            .map_err(|e| unresolvable(format!("{:#}", e)))?;
        let snapshot = self
            .store
            .import(fetcher.as_mut())
            .map_err(|e| unresolvable(format!("{:#}", e)))?;

        let locked = match &snapshot.rev {
            Some(rev) => pending.decl.locator.with_rev(rev),
            None => pending.decl.locator.clone(),
        };
        Ok((snapshot, locked))
    }

    /// The reusable lockfile entry for a node, if any.
    ///
    /// Path inputs are local and mutable, so they are always re-read.
    fn locked_entry(&self, pending: &Pending) -> Option<&'a encode::LockedRef> {
        let lockfile = self.lockfile?;
        if pending.decl.locator.is_path() {
            return None;
        }
        match &self.policy {
            UpdatePolicy::All => return None,
            UpdatePolicy::Inputs(names) if names.contains(&pending.path[0]) => return None,
            _ => {}
        }

        let entry = lockfile.node(&pending.id)?;
        if entry.original.as_deref() != Some(pending.decl.locator.to_url_string().as_str()) {
            return None;
        }
        entry.locked.as_ref()
    }
}

/// Allocate a node id: the input name, suffixed `_2`, `_3`, ... on collision.
fn unique_id(name: &str, used: &mut HashSet<String>) -> String {
    let mut id = name.to_string();
    let mut n = 2;
    while used.contains(&id) {
        id = format!("{}_{}", name, n);
        n += 1;
    }
    used.insert(id.clone());
    id
}

/// Turn follows declared by the manifest at `base` into root-relative paths.
fn absolute_follows(
    base: &[String],
    follows: &BTreeMap<String, String>,
) -> BTreeMap<String, Vec<String>> {
    follows
        .iter()
        .map(|(name, target)| {
            let mut path = base.to_vec();
            path.extend(target.split('/').map(str::to_string));
            (name.clone(), path)
        })
        .collect()
}

fn load_nested_manifest(
    snapshot_dir: &Path,
    pending: &Pending,
) -> Result<Option<Manifest>, ResolveError> {
    let path = snapshot_dir.join(MANIFEST_NAME);
    if !path.exists() {
        return Ok(None);
    }
    Manifest::load(&path)
        .map(Some)
        .map_err(|e| ResolveError::UnresolvableSource {
            input: pending.path.join("/"),
            locator: pending.decl.url.clone(),
            reason: format!("invalid {}: {:#}", MANIFEST_NAME, e),
        })
}

/// Collapse every edge to the fetched node it finally points at.
fn canonical_edges(
    nodes: &BTreeMap<String, InputNode>,
) -> Result<Vec<(String, String, String)>, ResolveError> {
    let mut edges = Vec::new();
    for node in nodes.values() {
        for (name, edge) in &node.inputs {
            let mut input = node.path.clone();
            input.push(name.clone());
            let mut chain = Vec::new();
            let target = follow_edge(nodes, &input.join("/"), edge, &mut chain)?;
            edges.push((node.id.clone(), name.clone(), target));
        }
    }
    Ok(edges)
}

fn follow_edge(
    nodes: &BTreeMap<String, InputNode>,
    input: &str,
    edge: &InputEdge,
    chain: &mut Vec<String>,
) -> Result<String, ResolveError> {
    match edge {
        InputEdge::Node(id) => Ok(id.clone()),
        InputEdge::Follows(path) => {
            let joined = path.join("/");
            if chain.contains(&joined) {
                chain.push(joined);
                return Err(ResolveError::FollowsCycle {
                    chain: chain.clone(),
                });
            }
            chain.push(joined.clone());

            let mut current = ROOT_NODE.to_string();
            for segment in path {
                let node = &nodes[&current];
                let next = node.inputs.get(segment).ok_or_else(|| {
                    ResolveError::FollowsTargetNotFound {
                        input: input.to_string(),
                        path: joined.clone(),
                    }
                })?;
                current = follow_edge(nodes, input, next, chain)?;
            }
            Ok(current)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_tree, TestInputs};
    use tempfile::TempDir;

    fn manifest_at(dir: &Path, content: &str) -> Manifest {
        let path = dir.join(MANIFEST_NAME);
        std::fs::write(&path, content).unwrap();
        Manifest::load(&path).unwrap()
    }

    #[test]
    fn test_follows_shares_one_snapshot() {
        let tmp = TempDir::new().unwrap();
        let inputs = TestInputs::new(tmp.path());
        inputs.package_repo("pkgs", &["rustfmt"]);
        inputs.package_repo("other-pkgs", &["statix"]);
        write_tree(
            &tmp.path().join("fmt"),
            &[(
                "Berth.toml",
                "[inputs]\nnixpkgs = \"path:../other-pkgs\"\n",
            )],
        );

        let manifest = manifest_at(
            tmp.path(),
            r#"
[inputs]
nixpkgs = "path:pkgs"

[inputs.treefmt]
url = "path:fmt"
follows = { nixpkgs = "nixpkgs" }
"#,
        );

        let store = SnapshotStore::new(tmp.path().join("cache"));
        let set = InputResolver::new(&store).resolve(&manifest).unwrap();

        assert_eq!(set.snapshot_count(), 2);
        let direct = set.lookup("nixpkgs").unwrap();
        let aliased = set.lookup("treefmt/nixpkgs").unwrap();
        assert_eq!(direct.id, aliased.id);
        assert_eq!(
            set.node("treefmt").unwrap().inputs["nixpkgs"],
            InputEdge::Follows(vec!["nixpkgs".into()])
        );
    }

    #[test]
    fn test_without_follows_transitive_input_is_fetched() {
        let tmp = TempDir::new().unwrap();
        let inputs = TestInputs::new(tmp.path());
        inputs.package_repo("pkgs", &["rustfmt"]);
        inputs.package_repo("other-pkgs", &["statix"]);
        write_tree(
            &tmp.path().join("fmt"),
            &[(
                "Berth.toml",
                "[inputs]\nnixpkgs = \"path:../other-pkgs\"\n",
            )],
        );

        let manifest = manifest_at(
            tmp.path(),
            "[inputs]\nnixpkgs = \"path:pkgs\"\ntreefmt = \"path:fmt\"\n",
        );

        let store = SnapshotStore::new(tmp.path().join("cache"));
        let set = InputResolver::new(&store).resolve(&manifest).unwrap();

        assert_eq!(set.snapshot_count(), 3);
        let nested = set.lookup("treefmt/nixpkgs").unwrap();
        assert_eq!(nested.id, "nixpkgs_2");
        assert_ne!(
            nested.snapshot.as_ref().unwrap().nar_hash,
            set.snapshot("nixpkgs").unwrap().nar_hash
        );
    }

    #[test]
    fn test_follows_missing_target() {
        let tmp = TempDir::new().unwrap();
        write_tree(
            &tmp.path().join("fmt"),
            &[("Berth.toml", "[inputs]\nnixpkgs = \"path:.\"\n")],
        );
        let manifest = manifest_at(
            tmp.path(),
            r#"
[inputs.treefmt]
url = "path:fmt"
follows = { nixpkgs = "nope" }
"#,
        );

        let store = SnapshotStore::new(tmp.path().join("cache"));
        let err = InputResolver::new(&store).resolve(&manifest).unwrap_err();
        assert!(matches!(err, ResolveError::FollowsTargetNotFound { .. }));
    }

    #[test]
    fn test_follows_cycle() {
        let tmp = TempDir::new().unwrap();
        write_tree(
            &tmp.path().join("a"),
            &[("Berth.toml", "[inputs]\nx = \"path:.\"\n")],
        );
        write_tree(
            &tmp.path().join("b"),
            &[("Berth.toml", "[inputs]\ny = \"path:.\"\n")],
        );
        let manifest = manifest_at(
            tmp.path(),
            r#"
[inputs.a]
url = "path:a"
follows = { x = "b/y" }

[inputs.b]
url = "path:b"
follows = { y = "a/x" }
"#,
        );

        let store = SnapshotStore::new(tmp.path().join("cache"));
        let err = InputResolver::new(&store).resolve(&manifest).unwrap_err();
        assert!(matches!(err, ResolveError::FollowsCycle { .. }));
    }

    #[test]
    fn test_missing_path_is_unresolvable() {
        let tmp = TempDir::new().unwrap();
        let manifest = manifest_at(tmp.path(), "[inputs]\nnixpkgs = \"path:missing\"\n");

        let store = SnapshotStore::new(tmp.path().join("cache"));
        let err = InputResolver::new(&store).resolve(&manifest).unwrap_err();
        match err {
            ResolveError::UnresolvableSource { input, reason, .. } => {
                assert_eq!(input, "nixpkgs");
                assert!(reason.contains("does not exist"));
            }
            other => panic!("expected UnresolvableSource, got {:?}", other),
        }
    }

    #[test]
    fn test_update_unknown_input() {
        let tmp = TempDir::new().unwrap();
        let manifest = manifest_at(tmp.path(), "[inputs]\n");
        let store = SnapshotStore::new(tmp.path().join("cache"));

        let err = InputResolver::new(&store)
            .with_policy(UpdatePolicy::Inputs(["nope".to_string()].into()))
            .resolve(&manifest)
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownInput { .. }));
    }

    #[test]
    fn test_unique_ids() {
        let mut used = HashSet::new();
        used.insert("root".to_string());
        assert_eq!(unique_id("nixpkgs", &mut used), "nixpkgs");
        assert_eq!(unique_id("nixpkgs", &mut used), "nixpkgs_2");
        assert_eq!(unique_id("nixpkgs", &mut used), "nixpkgs_3");
        assert_eq!(unique_id("root", &mut used), "root_2");
    }
}
