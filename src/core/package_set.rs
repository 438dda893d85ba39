//! Per-platform package sets.
//!
//! A package repository snapshot carries a `packages.toml` catalog. Instantiating
//! it for one platform yields the packages available there, each with a
//! deterministic store prefix.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::platform::Platform;
use crate::eval::errors::EvalError;
use crate::sources::Snapshot;
use crate::util::hash::Fingerprint;

/// Catalog file at the root of a package repository.
pub const CATALOG_NAME: &str = "packages.toml";

/// Default store directory for generated prefixes.
pub const DEFAULT_STORE_DIR: &str = "/nix/store";

/// A package available on one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub version: String,

    /// Installation prefix
    pub prefix: PathBuf,
}

impl Package {
    /// Directory holding the package's shared libraries.
    pub fn lib_dir(&self) -> PathBuf {
        self.prefix.join("lib")
    }

    /// Directory holding the package's executables.
    pub fn bin_dir(&self) -> PathBuf {
        self.prefix.join("bin")
    }
}

#[derive(Debug, Deserialize)]
struct Catalog {
    #[serde(default)]
    platforms: Option<Vec<String>>,

    #[serde(default, rename = "package")]
    packages: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    name: String,
    version: String,

    #[serde(default)]
    platforms: Option<Vec<String>>,

    #[serde(default)]
    prefix: Option<PathBuf>,
}

/// The packages of one platform, by name.
#[derive(Debug, Clone)]
pub struct PackageSet {
    platform: Platform,
    packages: BTreeMap<String, Package>,
}

impl PackageSet {
    /// Instantiate the package repository for `platform`.
    pub fn instantiate(
        snapshot: &Snapshot,
        platform: &Platform,
        store_dir: &Path,
    ) -> Result<Self, EvalError> {
        let path = snapshot.path.join(CATALOG_NAME);
        let content = std::fs::read_to_string(&path).map_err(|e| EvalError::Catalog {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        let catalog: Catalog = toml::from_str(&content).map_err(|e| EvalError::Catalog {
            message: format!("{}: {}", CATALOG_NAME, e.message()),
        })?;

        if let Some(supported) = &catalog.platforms {
            if !supported.iter().any(|p| p == platform.as_str()) {
                return Err(EvalError::UnsupportedPlatform {
                    supported: supported.clone(),
                });
            }
        }

        let mut packages = BTreeMap::new();
        for entry in catalog.packages {
            if let Some(platforms) = &entry.platforms {
                if !platforms.iter().any(|p| p == platform.as_str()) {
                    continue;
                }
            }

            let prefix = match entry.prefix {
                Some(prefix) => prefix,
                None => default_prefix(snapshot.id(), platform, &entry.name, &entry.version, store_dir),
            };
            if packages.contains_key(&entry.name) {
                return Err(EvalError::Catalog {
                    message: format!("package `{}` is listed twice for {}", entry.name, platform),
                });
            }
            packages.insert(
                entry.name.clone(),
                Package {
                    name: entry.name,
                    version: entry.version,
                    prefix,
                },
            );
        }

        tracing::debug!("{} packages available for {}", packages.len(), platform);
        Ok(PackageSet {
            platform: platform.clone(),
            packages,
        })
    }

    /// Build a set directly, bypassing the catalog.
    pub fn from_packages(platform: Platform, packages: impl IntoIterator<Item = Package>) -> Self {
        PackageSet {
            platform,
            packages: packages.into_iter().map(|p| (p.name.clone(), p)).collect(),
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Get a package by name.
    pub fn get(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    /// Get a package by name, failing with `MissingPackage`.
    pub fn require(&self, name: &str) -> Result<&Package, EvalError> {
        self.get(name).ok_or_else(|| EvalError::MissingPackage {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Iterate over packages, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }
}

/// `<store-dir>/<hash>-<pname>-<version>`.
fn default_prefix(
    snapshot_id: &str,
    platform: &Platform,
    name: &str,
    version: &str,
    store_dir: &Path,
) -> PathBuf {
    let mut fp = Fingerprint::new();
    fp.update_str(snapshot_id)
        .update_str(platform.as_str())
        .update_str(name)
        .update_str(version);
    let pname = name.rsplit('.').next().unwrap_or(name);
    store_dir.join(format!("{}-{}-{}", fp.finish_short(), pname, version))
}
