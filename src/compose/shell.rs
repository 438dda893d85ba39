//! Development shell composition.
//!
//! A shell declaration names packages by role. Composition looks every name up
//! eagerly in the platform's package set and derives the library search path.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::core::manifest::DevShellDecl;
use crate::core::package_set::{Package, PackageSet};
use crate::eval::errors::EvalError;
use crate::util::process::prepend_paths;

/// Variable carrying the library search path.
pub const LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";

/// A composed development shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellSpec {
    /// Interactive tools
    #[serde(serialize_with = "serialize_names")]
    pub packages: Vec<Package>,

    /// Build-time tools
    #[serde(serialize_with = "serialize_names")]
    pub native_build_inputs: Vec<Package>,

    /// Runtime libraries, in search order
    #[serde(serialize_with = "serialize_names")]
    pub build_inputs: Vec<Package>,

    /// `seed/lib:lib1/lib:...`
    pub ld_library_path: String,
}

fn serialize_names<S: serde::Serializer>(
    packages: &[Package],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(packages.iter().map(|p| &p.name))
}

impl ShellSpec {
    /// Compose a shell from its declaration.
    pub fn compose(packages: &PackageSet, decl: &DevShellDecl) -> Result<Self, EvalError> {
        let lookup = |names: &[String]| -> Result<Vec<Package>, EvalError> {
            names
                .iter()
                .map(|name| packages.require(name).cloned())
                .collect()
        };

        let interactive = lookup(&decl.packages)?;
        let native_build_inputs = lookup(&decl.native_build_inputs)?;
        let seed = decl
            .library_path_seed
            .as_deref()
            .map(|name| packages.require(name).cloned())
            .transpose()?;
        let build_inputs = lookup(&decl.build_inputs)?;

        let ld_library_path = library_path(seed.as_ref(), &build_inputs);

        Ok(ShellSpec {
            packages: interactive,
            native_build_inputs,
            build_inputs,
            ld_library_path,
        })
    }

    /// Variables the shell sets.
    pub fn env(&self) -> BTreeMap<&'static str, String> {
        let mut env = BTreeMap::new();
        env.insert(LIBRARY_PATH_VAR, self.ld_library_path.clone());
        env
    }

    /// `bin` directories put on `PATH` when the shell is entered.
    pub fn bin_dirs(&self) -> Vec<PathBuf> {
        self.packages
            .iter()
            .chain(&self.native_build_inputs)
            .map(Package::bin_dir)
            .collect()
    }

    /// `PATH` for an activated shell, given the caller's.
    pub fn activated_path(&self, existing: Option<&str>) -> String {
        prepend_paths(&self.bin_dirs(), existing)
    }
}

/// Left fold over the libraries, seeded with the seed library when present.
fn library_path(seed: Option<&Package>, libraries: &[Package]) -> String {
    let mut rest = libraries.iter();
    let init = match seed.or_else(|| rest.next()) {
        Some(first) => first.lib_dir().display().to_string(),
        None => return String::new(),
    };
    rest.fold(init, |acc, lib| format!("{}:{}", acc, lib.lib_dir().display()))
}
