//! Implementation of `berth add` and `berth remove`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use toml_edit::{value, DocumentMut, InlineTable, Item, Table};

use crate::core::locator::Locator;
use crate::util::fs;

/// Options for adding an input.
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Input name
    pub name: String,

    /// Locator (`path:`, `git+`, `github:`, `tarball+`)
    pub url: String,

    /// Nested input name -> path of the input it reuses
    pub follows: BTreeMap<String, String>,
}

/// Add (or replace) an input in Berth.toml, keeping formatting and comments.
pub fn add_input(manifest_path: &Path, opts: &AddOptions) -> Result<()> {
    Locator::parse(&opts.url).with_context(|| format!("invalid locator `{}`", opts.url))?;

    let mut doc = read_document(manifest_path)?;

    if !doc.contains_key("inputs") {
        doc["inputs"] = Item::Table(Table::new());
    }
    let inputs = doc["inputs"]
        .as_table_like_mut()
        .context("`inputs` in Berth.toml is not a table")?;

    inputs.insert(&opts.name, build_input_value(opts));

    fs::write_string(manifest_path, &doc.to_string())?;
    Ok(())
}

/// Build the TOML value for an input.
fn build_input_value(opts: &AddOptions) -> Item {
    if opts.follows.is_empty() {
        return value(opts.url.clone());
    }

    let mut follows = InlineTable::new();
    for (nested, target) in &opts.follows {
        follows.insert(nested.as_str(), target.clone().into());
    }

    let mut table = InlineTable::new();
    table.insert("url", opts.url.clone().into());
    table.insert("follows", follows.into());
    Item::Value(table.into())
}

/// Remove an input from Berth.toml.
///
/// Refuses when another part of the manifest still refers to the input.
pub fn remove_input(manifest_path: &Path, name: &str) -> Result<()> {
    let mut doc = read_document(manifest_path)?;

    for section in ["systems", "packages"] {
        let refers = doc
            .get(section)
            .and_then(|s| s.get("input"))
            .and_then(|i| i.as_str())
            == Some(name);
        if refers {
            bail!("input `{}` is used by [{}]; change that first", name, section);
        }
    }

    let inputs = doc
        .get_mut("inputs")
        .and_then(|i| i.as_table_like_mut())
        .context("no inputs in Berth.toml")?;
    if inputs.remove(name).is_none() {
        bail!("input `{}` not found in Berth.toml", name);
    }

    fs::write_string(manifest_path, &doc.to_string())?;
    Ok(())
}

/// Parse `nested=target` pairs given on the command line.
pub fn parse_follows(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((nested, target)) if !nested.is_empty() && !target.is_empty() => {
                Ok((nested.to_string(), target.to_string()))
            }
            _ => bail!("invalid follows `{}`: expected `name=path`", pair),
        })
        .collect()
}

fn read_document(manifest_path: &Path) -> Result<DocumentMut> {
    let content = fs::read_to_string(manifest_path)?;
    content
        .parse()
        .with_context(|| format!("failed to parse {}", manifest_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Manifest;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"# my project
[inputs]
nixpkgs = "github:NixOS/nixpkgs/nixos-unstable" # pinned channel

[packages]
input = "nixpkgs"
"#;

    fn create_test_manifest(dir: &Path) -> std::path::PathBuf {
        let manifest_path = dir.join("Berth.toml");
        std::fs::write(&manifest_path, MANIFEST).unwrap();
        manifest_path
    }

    #[test]
    fn test_add_simple_input_keeps_comments() {
        let tmp = TempDir::new().unwrap();
        let manifest_path = create_test_manifest(tmp.path());

        let opts = AddOptions {
            name: "systems".into(),
            url: "github:nix-systems/default".into(),
            follows: BTreeMap::new(),
        };
        add_input(&manifest_path, &opts).unwrap();

        let content = std::fs::read_to_string(&manifest_path).unwrap();
        assert!(content.contains("# pinned channel"));
        assert!(content.contains("systems = \"github:nix-systems/default\""));
        assert_eq!(Manifest::load(&manifest_path).unwrap().inputs.len(), 2);
    }

    #[test]
    fn test_add_input_with_follows() {
        let tmp = TempDir::new().unwrap();
        let manifest_path = create_test_manifest(tmp.path());

        let opts = AddOptions {
            name: "treefmt".into(),
            url: "github:numtide/treefmt-nix".into(),
            follows: parse_follows(&["nixpkgs=nixpkgs".to_string()]).unwrap(),
        };
        add_input(&manifest_path, &opts).unwrap();

        let manifest = Manifest::load(&manifest_path).unwrap();
        let treefmt = manifest.input("treefmt").unwrap();
        assert_eq!(treefmt.follows["nixpkgs"], "nixpkgs");
    }

    #[test]
    fn test_add_rejects_bad_locator() {
        let tmp = TempDir::new().unwrap();
        let manifest_path = create_test_manifest(tmp.path());

        let opts = AddOptions {
            name: "bad".into(),
            url: "ftp://example.com/x".into(),
            follows: BTreeMap::new(),
        };
        assert!(add_input(&manifest_path, &opts).is_err());
        assert_eq!(std::fs::read_to_string(&manifest_path).unwrap(), MANIFEST);
    }

    #[test]
    fn test_remove_input() {
        let tmp = TempDir::new().unwrap();
        let manifest_path = create_test_manifest(tmp.path());
        add_input(
            &manifest_path,
            &AddOptions {
                name: "systems".into(),
                url: "github:nix-systems/default".into(),
                follows: BTreeMap::new(),
            },
        )
        .unwrap();

        remove_input(&manifest_path, "systems").unwrap();
        let content = std::fs::read_to_string(&manifest_path).unwrap();
        assert!(!content.contains("nix-systems"));
    }

    #[test]
    fn test_remove_refuses_used_input() {
        let tmp = TempDir::new().unwrap();
        let manifest_path = create_test_manifest(tmp.path());

        let err = remove_input(&manifest_path, "nixpkgs").unwrap_err();
        assert!(err.to_string().contains("used by [packages]"));
    }

    #[test]
    fn test_remove_missing_input() {
        let tmp = TempDir::new().unwrap();
        let manifest_path = create_test_manifest(tmp.path());

        let err = remove_input(&manifest_path, "nope").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_parse_follows_rejects_malformed() {
        assert!(parse_follows(&["nixpkgs".to_string()]).is_err());
        assert!(parse_follows(&["=x".to_string()]).is_err());
    }
}
