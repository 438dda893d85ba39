//! Implementation of `berth init`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::manifest::generate_default_manifest;
use crate::core::workspace::{find_manifest, MANIFEST_NAME};

/// Options for initializing a project.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Project name (default: directory name)
    pub name: Option<String>,
}

/// Write a starter Berth.toml into `path`, creating the directory if needed.
pub fn init_project(path: &Path, opts: &InitOptions) -> Result<PathBuf> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }

    if let Some(existing) = find_manifest(path) {
        bail!(
            "`{}` already exists in `{}`",
            existing
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| MANIFEST_NAME.to_string()),
            path.display()
        );
    }

    let name = match &opts.name {
        Some(name) => name.clone(),
        None => default_name(path)?,
    };

    let manifest_path = path.join(MANIFEST_NAME);
    fs::write(&manifest_path, generate_default_manifest(&name))
        .with_context(|| format!("failed to write {}", MANIFEST_NAME))?;

    tracing::info!("Created {}", manifest_path.display());
    Ok(manifest_path)
}

fn default_name(path: &Path) -> Result<String> {
    let absolute = path
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", path.display()))?;
    absolute
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("cannot derive a project name from {}", absolute.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Manifest;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_parseable_manifest() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("viewer");

        let path = init_project(&dir, &InitOptions::default()).unwrap();
        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.name(), "viewer");
        assert!(manifest.evaluation_config().is_ok());
    }

    #[test]
    fn test_init_with_name() {
        let tmp = TempDir::new().unwrap();
        let opts = InitOptions {
            name: Some("demo".into()),
        };

        let path = init_project(tmp.path(), &opts).unwrap();
        assert_eq!(Manifest::load(&path).unwrap().name(), "demo");
    }

    #[test]
    fn test_init_refuses_existing_manifest() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("berth.toml"), "").unwrap();

        let err = init_project(tmp.path(), &InitOptions::default()).unwrap_err();
        assert!(err.to_string().contains("`berth.toml` already exists"));
    }
}
