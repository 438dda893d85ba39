//! Lockfile I/O operations.

use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::core::Manifest;
use crate::resolver::{InputSet, Lockfile};

/// Load a lockfile from the given path.
pub fn load_lockfile(path: &Path) -> Result<Option<Lockfile>> {
    if !path.exists() {
        return Ok(None);
    }

    let lockfile = Lockfile::load(path)?;

    if !lockfile.is_compatible() {
        anyhow::bail!(
            "lockfile version {} is not compatible with this version of Berth",
            lockfile.version
        );
    }

    Ok(Some(lockfile))
}

/// Save an input set to the lockfile.
pub fn save_lockfile(path: &Path, set: &InputSet, manifest: &Manifest) -> Result<Lockfile> {
    let manifest_hash = compute_manifest_hash(manifest)?;
    let lockfile = Lockfile::from_input_set(set).with_manifest_hash(manifest_hash);
    lockfile.save(path)?;
    Ok(lockfile)
}

/// Compute a hash of the manifest's resolution-affecting fields.
///
/// Only input locators and follows take part, so editing dev shells, the
/// formatter roster or comments never makes the lockfile stale.
pub fn compute_manifest_hash(manifest: &Manifest) -> Result<String> {
    let mut normalized = serde_json::Map::new();
    normalized.insert("inputs".to_string(), manifest.inputs_fingerprint_json());

    let bytes = serde_json::to_vec(&serde_json::Value::Object(normalized))
        .context("failed to serialize normalized manifest")?;
    let hash = Sha256::digest(&bytes);
    Ok(hex::encode(hash))
}

/// Check if the lockfile needs updating.
///
/// Returns true if:
/// - Lockfile doesn't exist or cannot be parsed
/// - Lockfile has no manifest hash
/// - Manifest content hash differs from lockfile's recorded hash
pub fn lockfile_needs_update(manifest: &Manifest, lockfile_path: &Path) -> Result<bool> {
    if !lockfile_path.exists() {
        return Ok(true);
    }

    let lockfile = match Lockfile::load(lockfile_path) {
        Ok(lf) => lf,
        Err(_) => return Ok(true),
    };

    let Some(stored_hash) = lockfile.manifest_hash() else {
        return Ok(true);
    };

    Ok(stored_hash != compute_manifest_hash(manifest)?)
}
