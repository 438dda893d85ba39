//! Lockfile encoding and decoding.
//!
//! Berth.lock is the canonical lockfile format for Berth. It mirrors the input
//! graph: one table per node, with edges either naming a node id or spelling
//! out a follows path.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::locator::Locator;
use crate::resolver::resolve::{InputEdge, InputSet, ROOT_NODE};

/// Current lockfile format version.
pub const LOCKFILE_VERSION: u32 = 1;

/// Lockfile representation for serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Lockfile {
    /// Lockfile format version
    pub version: u32,

    /// Hash of the manifest's resolution-affecting fields.
    /// Used for content-based freshness detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_hash: Option<String>,

    /// Id of the project node
    pub root: String,

    /// Locked nodes by id
    #[serde(default)]
    pub nodes: BTreeMap<String, LockedNode>,
}

/// A locked node entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedNode {
    /// Locator as declared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,

    /// Exact identity of the fetched content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<LockedRef>,

    /// This node's inputs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, LockedEdge>,
}

/// The pinned identity of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LockedRef {
    /// Locator kind (path, git, tarball)
    pub kind: String,

    /// Pinned locator
    pub url: String,

    /// Exact revision, for git
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,

    /// Content hash (`sha256-<hex>`)
    pub nar_hash: String,
}

/// An edge in the lockfile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LockedEdge {
    /// Node id
    Node(String),
    /// Follows path from the root
    Follows(Vec<String>),
}

impl From<&InputEdge> for LockedEdge {
    fn from(edge: &InputEdge) -> Self {
        match edge {
            InputEdge::Node(id) => LockedEdge::Node(id.clone()),
            InputEdge::Follows(path) => LockedEdge::Follows(path.clone()),
        }
    }
}

impl LockedRef {
    /// Parse the pinned locator.
    pub fn locator(&self) -> Result<Locator> {
        Locator::parse(&self.url)
    }
}

impl Lockfile {
    /// Create a new lockfile from an InputSet.
    pub fn from_input_set(set: &InputSet) -> Self {
        let nodes = set
            .nodes()
            .map(|node| {
                let locked = match (&node.locked, &node.snapshot) {
                    (Some(locator), Some(snapshot)) => Some(LockedRef {
                        kind: locator.kind_str().to_string(),
                        url: locator.to_url_string(),
                        rev: snapshot.rev.clone(),
                        nar_hash: snapshot.nar_hash.clone(),
                    }),
                    _ => None,
                };
                let entry = LockedNode {
                    original: node.original.as_ref().map(|l| l.to_url_string()),
                    locked,
                    inputs: node
                        .inputs
                        .iter()
                        .map(|(name, edge)| (name.clone(), LockedEdge::from(edge)))
                        .collect(),
                };
                (node.id.clone(), entry)
            })
            .collect();

        Lockfile {
            version: LOCKFILE_VERSION,
            manifest_hash: None,
            root: ROOT_NODE.to_string(),
            nodes,
        }
    }

    /// Set the manifest hash for content-based freshness detection.
    pub fn with_manifest_hash(mut self, hash: String) -> Self {
        self.manifest_hash = Some(hash);
        self
    }

    /// Get the manifest hash, if present.
    pub fn manifest_hash(&self) -> Option<&str> {
        self.manifest_hash.as_deref()
    }

    /// Get a locked node by id.
    pub fn node(&self, id: &str) -> Option<&LockedNode> {
        self.nodes.get(id)
    }

    /// Load a lockfile from a path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read lockfile: {}", path.display()))?;

        toml::from_str(&content).with_context(|| "failed to parse lockfile")
    }

    /// Serialize to the on-disk format.
    pub fn to_toml(&self) -> Result<String> {
        let content = toml::to_string_pretty(self)?;

        Ok(format!(
            "# This file is automatically generated by Berth.\n\
             # It is not intended for manual editing.\n\n\
             {content}"
        ))
    }

    /// Save the lockfile to a path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write lockfile: {}", path.display()))?;

        Ok(())
    }

    /// Check if the lockfile is compatible with this version of Berth.
    pub fn is_compatible(&self) -> bool {
        self.version == LOCKFILE_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Lockfile {
        let mut root = LockedNode::default();
        root.inputs
            .insert("nixpkgs".into(), LockedEdge::Node("nixpkgs".into()));
        root.inputs
            .insert("treefmt".into(), LockedEdge::Node("treefmt".into()));

        let mut treefmt = LockedNode {
            original: Some("git+https://github.com/numtide/treefmt-nix".into()),
            locked: Some(LockedRef {
                kind: "git".into(),
                url: "git+https://github.com/numtide/treefmt-nix?rev=abc".into(),
                rev: Some("abc".into()),
                nar_hash: "sha256-1111".into(),
            }),
            inputs: BTreeMap::new(),
        };
        treefmt
            .inputs
            .insert("nixpkgs".into(), LockedEdge::Follows(vec!["nixpkgs".into()]));

        let nixpkgs = LockedNode {
            original: Some("path:./pkgs".into()),
            locked: Some(LockedRef {
                kind: "path".into(),
                url: "path:./pkgs".into(),
                rev: None,
                nar_hash: "sha256-2222".into(),
            }),
            inputs: BTreeMap::new(),
        };

        let mut nodes = BTreeMap::new();
        nodes.insert("root".to_string(), root);
        nodes.insert("treefmt".to_string(), treefmt);
        nodes.insert("nixpkgs".to_string(), nixpkgs);

        Lockfile {
            version: LOCKFILE_VERSION,
            manifest_hash: Some("feed".into()),
            root: "root".into(),
            nodes,
        }
    }

    #[test]
    fn test_lockfile_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let lock_path = tmp.path().join("Berth.lock");

        let lockfile = sample();
        lockfile.save(&lock_path).unwrap();

        let loaded = Lockfile::load(&lock_path).unwrap();
        assert_eq!(loaded, lockfile);
        assert!(loaded.is_compatible());
        assert_eq!(
            loaded.node("treefmt").unwrap().inputs["nixpkgs"],
            LockedEdge::Follows(vec!["nixpkgs".into()])
        );
    }

    #[test]
    fn test_lockfile_format() {
        let toml = sample().to_toml().unwrap();
        assert!(toml.starts_with("# This file is automatically generated by Berth."));
        assert!(toml.contains("version = 1"));
        assert!(toml.contains("manifest-hash = \"feed\""));
        assert!(toml.contains("nar-hash = \"sha256-1111\""));
    }
}
