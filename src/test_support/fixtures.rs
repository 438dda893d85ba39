//! Test fixtures: catalogs, systems files and fake formatter engines.
//!
//! Fake engines are small `sh` scripts installed as `<prefix>/bin/<program>`.
//! They receive the same arguments the real engines would and treat every
//! argument naming an existing file as a file to rewrite.

use std::path::{Path, PathBuf};

use crate::compose::engines::EngineKind;
use crate::core::package_set::{Package, PackageSet};
use crate::core::platform::Platform;

/// Squeezes runs of spaces in every file argument.
pub const SQUEEZE_ENGINE: &str = r#"#!/bin/sh
for f in "$@"; do
    [ -f "$f" ] || continue
    tr -s ' ' < "$f" > "$f.berth-tmp" && mv "$f.berth-tmp" "$f"
done
"#;

/// Squeezes like [`SQUEEZE_ENGINE`], but leaves a file alone when a
/// `rustfmt.toml` sits in its directory or any directory above it.
pub const CONFIG_AWARE_ENGINE: &str = r#"#!/bin/sh
for f in "$@"; do
    [ -f "$f" ] || continue
    d=$(cd "$(dirname "$f")" && pwd)
    while [ ! -f "$d/rustfmt.toml" ] && [ "$d" != / ]; do
        d=$(dirname "$d")
    done
    [ -f "$d/rustfmt.toml" ] && continue
    tr -s ' ' < "$f" > "$f.berth-tmp" && mv "$f.berth-tmp" "$f"
done
"#;

/// Always fails.
pub const FAILING_ENGINE: &str = "#!/bin/sh\necho \"cannot parse input\" >&2\nexit 1\n";

/// A `packages.toml` listing `packages` at version 1.0.
pub fn catalog(packages: &[&str]) -> String {
    let mut out = String::new();
    for name in packages {
        out.push_str(&format!(
            "[[package]]\nname = \"{}\"\nversion = \"1.0\"\n\n",
            name
        ));
    }
    out
}

/// A `packages.toml` with explicit prefixes.
pub fn catalog_with_prefixes(packages: &[(&str, &Path)]) -> String {
    let mut out = String::new();
    for (name, prefix) in packages {
        out.push_str(&format!(
            "[[package]]\nname = \"{}\"\nversion = \"1.0\"\nprefix = \"{}\"\n\n",
            name,
            prefix.display()
        ));
    }
    out
}

/// A `systems.toml` listing `systems`.
pub fn systems_file(systems: &[&str]) -> String {
    let quoted: Vec<String> = systems.iter().map(|s| format!("\"{}\"", s)).collect();
    format!("systems = [{}]\n", quoted.join(", "))
}

/// Install `script` as `<prefix>/bin/<program>`.
pub fn install_script(prefix: &Path, program: &str, script: &str) -> PathBuf {
    let bin = prefix.join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let path = bin.join(program);
    std::fs::write(&path, script).unwrap();
    crate::util::fs::set_executable(&path).unwrap();
    path
}

fn engine_set_with(dir: &Path, script_for: impl Fn(EngineKind) -> String) -> PackageSet {
    let packages = EngineKind::default_roster().iter().map(|kind| {
        let def = kind.def();
        let prefix = dir.join(def.package);
        install_script(&prefix, def.program, &script_for(*kind));
        Package {
            name: def.package.to_string(),
            version: "1.0".to_string(),
            prefix,
        }
    });
    let packages: Vec<Package> = packages.collect();
    PackageSet::from_packages(Platform::new("x86_64-linux").unwrap(), packages)
}

/// A package set providing all four engines as whitespace squeezers.
pub fn engine_package_set(dir: &Path) -> PackageSet {
    engine_set_with(dir, |_| SQUEEZE_ENGINE.to_string())
}

/// Engines that honour `rustfmt.toml` the way rustfmt looks it up.
pub fn config_aware_engine_package_set(dir: &Path) -> PackageSet {
    engine_set_with(dir, |_| CONFIG_AWARE_ENGINE.to_string())
}

/// Engines that append their own name to `log` on every invocation.
pub fn logging_engine_package_set(dir: &Path, log: &Path) -> PackageSet {
    engine_set_with(dir, |kind| {
        format!("#!/bin/sh\necho {} >> \"{}\"\n", kind, log.display())
    })
}

/// Engines that always fail.
pub fn failing_engine_package_set(dir: &Path) -> PackageSet {
    engine_set_with(dir, |_| FAILING_ENGINE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_parses() {
        let table: toml::Table = toml::from_str(&catalog(&["a", "b"])).unwrap();
        assert_eq!(table["package"].as_array().unwrap().len(), 2);

        let systems: toml::Table = toml::from_str(&systems_file(&["x86_64-linux"])).unwrap();
        assert_eq!(systems["systems"].as_array().unwrap().len(), 1);
    }
}
