//! Platform enumeration and per-platform fan-out.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use serde::Deserialize;

use crate::core::manifest::SystemsDecl;
use crate::core::platform::Platform;
use crate::eval::errors::EvalError;
use crate::resolver::InputSet;

/// Platform list file at the root of a systems input.
pub const SYSTEMS_FILE: &str = "systems.toml";

#[derive(Debug, Deserialize)]
struct SystemsFile {
    systems: Vec<Platform>,
}

/// Read the declared platform list.
///
/// A missing or malformed `systems.toml` fails the whole evaluation: the file
/// belongs to the shared input set, not to any one platform.
pub fn load_platforms(decl: &SystemsDecl, inputs: &InputSet) -> Result<Vec<Platform>> {
    match decl {
        SystemsDecl::List(list) => Ok(list.clone()),
        SystemsDecl::Input(name) => {
            let snapshot = inputs
                .snapshot(name)
                .with_context(|| format!("systems input `{}` was not resolved", name))?;
            let path = snapshot.path.join(SYSTEMS_FILE);
            if !path.is_file() {
                bail!("systems input `{}` has no {}", name, SYSTEMS_FILE);
            }
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let file: SystemsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse {} of input `{}`", SYSTEMS_FILE, name))?;
            Ok(file.systems)
        }
    }
}

/// A value per platform; each entry succeeded or failed on its own.
#[derive(Debug, Clone)]
pub struct SystemMap<T> {
    entries: BTreeMap<Platform, Result<T, EvalError>>,
}

impl<T> SystemMap<T> {
    /// Get the entry for a platform.
    pub fn get(&self, platform: &Platform) -> Option<Result<&T, &EvalError>> {
        self.entries.get(platform).map(Result::as_ref)
    }

    /// Platforms, sorted.
    pub fn platforms(&self) -> impl Iterator<Item = &Platform> {
        self.entries.keys()
    }

    /// Entries, sorted by platform.
    pub fn iter(&self) -> impl Iterator<Item = (&Platform, Result<&T, &EvalError>)> {
        self.entries.iter().map(|(p, r)| (p, r.as_ref()))
    }

    /// Failed entries, sorted by platform.
    pub fn errors(&self) -> impl Iterator<Item = &EvalError> {
        self.entries.values().filter_map(|r| r.as_ref().err())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Evaluate `f` for every platform, in parallel.
///
/// The result has exactly one key per distinct platform. Failures are wrapped
/// as [`EvalError::PlatformEvaluationError`] and never affect other entries.
pub fn for_each_system<T, F>(platforms: &[Platform], f: F) -> SystemMap<T>
where
    T: Send,
    F: Fn(&Platform) -> Result<T, EvalError> + Sync,
{
    let distinct: Vec<&Platform> = platforms.iter().collect::<BTreeSet<_>>().into_iter().collect();

    let results: Vec<(Platform, Result<T, EvalError>)> = distinct
        .into_par_iter()
        .map(|platform| {
            tracing::debug!("Evaluating {}", platform);
            let result = f(platform).map_err(|e| EvalError::for_platform(platform, e));
            (platform.clone(), result)
        })
        .collect();

    SystemMap {
        entries: results.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_tree, TestInputs};
    use tempfile::TempDir;

    fn platforms(names: &[&str]) -> Vec<Platform> {
        names.iter().map(|n| Platform::new(*n).unwrap()).collect()
    }

    #[test]
    fn test_keys_equal_declared_platforms() {
        let declared = platforms(&["x86_64-linux", "aarch64-darwin", "x86_64-linux", "aarch64-linux"]);
        let map = for_each_system(&declared, |p| Ok(p.as_str().len()));

        let keys: Vec<_> = map.platforms().map(Platform::as_str).collect();
        assert_eq!(keys, vec!["aarch64-darwin", "aarch64-linux", "x86_64-linux"]);
        assert_eq!(map.get(&declared[0]), Some(Ok(&12)));
    }

    #[test]
    fn test_failure_is_contained() {
        let declared = platforms(&["x86_64-linux", "aarch64-darwin"]);
        let map = for_each_system(&declared, |p| {
            if p.as_str().ends_with("darwin") {
                Err(EvalError::MissingPackage {
                    name: "wayland".into(),
                })
            } else {
                Ok(())
            }
        });

        assert_eq!(map.len(), 2);
        assert!(map.get(&declared[0]).unwrap().is_ok());
        let err = map.get(&declared[1]).unwrap().unwrap_err();
        assert_eq!(
            err.to_string(),
            "platform aarch64-darwin: package `wayland` is not in the package set"
        );
        assert_eq!(map.errors().count(), 1);
    }

    #[test]
    fn test_empty_platform_list() {
        let map = for_each_system(&[], |_| Ok(()));
        assert!(map.is_empty());
    }

    #[test]
    fn test_load_platforms_from_input() {
        let tmp = TempDir::new().unwrap();
        let inputs = TestInputs::new(tmp.path());
        inputs.systems("systems", &["x86_64-linux", "aarch64-linux"]);
        write_tree(tmp.path(), &[("Berth.toml", "[inputs]\nsystems = \"path:systems\"\n")]);

        let set = inputs.resolve();
        let list = load_platforms(&SystemsDecl::Input("systems".into()), &set).unwrap();
        assert_eq!(list, platforms(&["x86_64-linux", "aarch64-linux"]));
    }

    #[test]
    fn test_load_platforms_malformed_file() {
        let tmp = TempDir::new().unwrap();
        let inputs = TestInputs::new(tmp.path());
        write_tree(&tmp.path().join("systems"), &[("systems.toml", "systems = \"x86_64-linux\"\n")]);
        write_tree(tmp.path(), &[("Berth.toml", "[inputs]\nsystems = \"path:systems\"\n")]);

        let set = inputs.resolve();
        let err = load_platforms(&SystemsDecl::Input("systems".into()), &set).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to parse systems.toml"));
    }

    #[test]
    fn test_load_platforms_inline() {
        let set = TestInputs::empty_set();
        let list = load_platforms(&SystemsDecl::List(platforms(&["riscv64-linux"])), &set).unwrap();
        assert_eq!(list, platforms(&["riscv64-linux"]));
    }
}
