//! Evaluation: fan the resolved inputs out over platforms and compose each
//! platform's artifacts.
//!
//! Errors are contained at the narrowest level that produced them: a platform
//! whose package set cannot be instantiated fails as a whole, while a missing
//! formatter engine or shell package fails only that artifact.

pub mod errors;
pub mod systems;

pub use errors::EvalError;
pub use systems::{for_each_system, load_platforms, SystemMap};

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::compose::{Formatter, FormattingCheck, ShellSpec};
use crate::core::manifest::EvaluationConfig;
use crate::core::package_set::PackageSet;
use crate::core::platform::Platform;
use crate::sources::Snapshot;

/// Name of the formatter check.
pub const FORMATTING_CHECK: &str = "formatting";

/// Everything composed for one platform.
#[derive(Debug, Clone)]
pub struct PlatformOutputs {
    pub formatter: Result<Formatter, EvalError>,
    pub checks: BTreeMap<String, Result<FormattingCheck, EvalError>>,
    pub dev_shells: BTreeMap<String, Result<ShellSpec, EvalError>>,
}

/// Instantiate the package set for `platform` and compose its artifacts.
pub fn evaluate_platform(
    packages_snapshot: &Snapshot,
    platform: &Platform,
    store_dir: &Path,
    config: &EvaluationConfig<'_>,
) -> Result<PlatformOutputs, EvalError> {
    let packages = PackageSet::instantiate(packages_snapshot, platform, store_dir)?;
    let wrap = |e: EvalError| EvalError::for_platform(platform, e);

    let formatter = Formatter::compose(&packages, config.formatter).map_err(wrap);
    let check = formatter
        .as_ref()
        .map(|f| FormattingCheck::new(f.clone()))
        .map_err(|e| e.clone());
    let mut checks = BTreeMap::new();
    checks.insert(FORMATTING_CHECK.to_string(), check);

    let dev_shells = config
        .dev_shells
        .iter()
        .map(|(name, decl)| {
            (
                name.clone(),
                ShellSpec::compose(&packages, decl).map_err(wrap),
            )
        })
        .collect();

    Ok(PlatformOutputs {
        formatter,
        checks,
        dev_shells,
    })
}

/// The evaluated outputs of a project, keyed by platform.
#[derive(Debug, Clone)]
pub struct Outputs {
    systems: SystemMap<PlatformOutputs>,
}

impl Outputs {
    pub fn new(systems: SystemMap<PlatformOutputs>) -> Self {
        Outputs { systems }
    }

    /// Evaluated platforms, sorted.
    pub fn platforms(&self) -> impl Iterator<Item = &Platform> {
        self.systems.platforms()
    }

    /// Everything composed for one platform.
    pub fn platform(&self, platform: &Platform) -> Option<Result<&PlatformOutputs, &EvalError>> {
        self.systems.get(platform)
    }

    /// The formatter of a platform.
    pub fn formatter(&self, platform: &Platform) -> Option<Result<&Formatter, &EvalError>> {
        Some(self.platform(platform)?.and_then(|p| p.formatter.as_ref()))
    }

    /// A named check of a platform.
    pub fn check(
        &self,
        platform: &Platform,
        name: &str,
    ) -> Option<Result<&FormattingCheck, &EvalError>> {
        match self.platform(platform)? {
            Ok(outputs) => outputs.checks.get(name).map(Result::as_ref),
            Err(e) => Some(Err(e)),
        }
    }

    /// A named dev shell of a platform.
    pub fn dev_shell(
        &self,
        platform: &Platform,
        name: &str,
    ) -> Option<Result<&ShellSpec, &EvalError>> {
        match self.platform(platform)? {
            Ok(outputs) => outputs.dev_shells.get(name).map(Result::as_ref),
            Err(e) => Some(Err(e)),
        }
    }

    /// Every failure, platform-level and per-artifact, sorted by platform.
    pub fn errors(&self) -> Vec<&EvalError> {
        let mut errors = Vec::new();
        for (_, entry) in self.systems.iter() {
            match entry {
                Err(e) => errors.push(e),
                Ok(outputs) => {
                    errors.extend(outputs.formatter.as_ref().err());
                    errors.extend(outputs.dev_shells.values().filter_map(|r| r.as_ref().err()));
                }
            }
        }
        errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors().is_empty()
    }
}

/// A serialized output entry: the value, or `{"error": "..."}`.
#[derive(Serialize)]
#[serde(untagged)]
enum Entry<T> {
    Value(T),
    Error { error: String },
}

impl<T> Entry<T> {
    fn from_result<U>(result: Result<U, &EvalError>, f: impl FnOnce(U) -> T) -> Self {
        match result {
            Ok(value) => Entry::Value(f(value)),
            Err(e) => Entry::Error {
                error: e.to_string(),
            },
        }
    }
}

#[derive(Serialize)]
struct OutputsView<'a> {
    formatter: BTreeMap<&'a str, Entry<&'a Formatter>>,
    checks: BTreeMap<&'a str, Entry<BTreeMap<&'a str, Entry<&'a FormattingCheck>>>>,
    #[serde(rename = "devShells")]
    dev_shells: BTreeMap<&'a str, Entry<BTreeMap<&'a str, Entry<&'a ShellSpec>>>>,
}

impl Serialize for Outputs {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut view = OutputsView {
            formatter: BTreeMap::new(),
            checks: BTreeMap::new(),
            dev_shells: BTreeMap::new(),
        };

        for (platform, entry) in self.systems.iter() {
            let key = platform.as_str();
            view.formatter.insert(
                key,
                Entry::from_result(entry.and_then(|o| o.formatter.as_ref()), |f| f),
            );
            view.checks.insert(
                key,
                Entry::from_result(entry, |o| {
                    o.checks
                        .iter()
                        .map(|(name, r)| (name.as_str(), Entry::from_result(r.as_ref(), |c| c)))
                        .collect()
                }),
            );
            view.dev_shells.insert(
                key,
                Entry::from_result(entry, |o| {
                    o.dev_shells
                        .iter()
                        .map(|(name, r)| (name.as_str(), Entry::from_result(r.as_ref(), |s| s)))
                        .collect()
                }),
            );
        }

        view.serialize(serializer)
    }
}
