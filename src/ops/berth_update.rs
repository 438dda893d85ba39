//! Implementation of `berth update`.

use std::collections::BTreeSet;
use std::fmt;

use anyhow::Result;

use crate::core::Workspace;
use crate::ops::resolve::{resolve_workspace_with_opts, Resolution, ResolveOptions};
use crate::resolver::encode::LockedRef;
use crate::resolver::{Lockfile, UpdatePolicy};
use crate::util::hash::HASH_PREFIX;

/// Options for update command.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Top-level inputs to update (empty = all)
    pub inputs: Vec<String>,

    /// Dry run - show what would be updated without changing lockfile
    pub dry_run: bool,
}

/// How one locked node changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockChange {
    Added { id: String, to: String },
    Removed { id: String, from: String },
    Updated { id: String, from: String, to: String },
}

impl fmt::Display for LockChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockChange::Added { id, to } => write!(f, "{} ({})", id, to),
            LockChange::Removed { id, from } => write!(f, "{} ({})", id, from),
            LockChange::Updated { id, from, to } => write!(f, "{} {} -> {}", id, from, to),
        }
    }
}

/// Result of an update.
#[derive(Debug)]
pub struct UpdateResult {
    pub resolution: Resolution,
    pub changes: Vec<LockChange>,
}

/// Re-resolve inputs, ignoring their locked revisions.
///
/// This is the only operation that moves an unchanged input to a newer
/// revision.
pub fn update(ws: &Workspace, opts: &UpdateOptions) -> Result<UpdateResult> {
    if opts.dry_run {
        tracing::info!("Dry run - lockfile will not be modified");
    }

    let policy = if opts.inputs.is_empty() {
        UpdatePolicy::All
    } else {
        UpdatePolicy::Inputs(opts.inputs.iter().cloned().collect::<BTreeSet<_>>())
    };

    let resolution = resolve_workspace_with_opts(
        ws,
        &ResolveOptions {
            policy,
            locked: false,
            dry_run: opts.dry_run,
        },
    )?;

    let changes = diff_lockfiles(resolution.previous.as_ref(), &resolution.lockfile);
    Ok(UpdateResult {
        resolution,
        changes,
    })
}

/// Compare the pinned identity of every node in two lockfiles.
pub fn diff_lockfiles(old: Option<&Lockfile>, new: &Lockfile) -> Vec<LockChange> {
    let mut changes = Vec::new();
    let pinned = |lockfile: &Lockfile, id: &str| -> Option<String> {
        lockfile.node(id)?.locked.as_ref().map(describe)
    };

    for id in new.nodes.keys() {
        let Some(to) = pinned(new, id) else {
            continue;
        };
        match old.and_then(|o| pinned(o, id)) {
            None => changes.push(LockChange::Added { id: id.clone(), to }),
            Some(from) if from != to => changes.push(LockChange::Updated {
                id: id.clone(),
                from,
                to,
            }),
            Some(_) => {}
        }
    }

    if let Some(old) = old {
        for id in old.nodes.keys() {
            if new.node(id).is_none() {
                if let Some(from) = pinned(old, id) {
                    changes.push(LockChange::Removed { id: id.clone(), from });
                }
            }
        }
    }

    changes
}

/// Short human form of a pinned node: the revision if any, else the hash.
fn describe(locked: &LockedRef) -> String {
    match &locked.rev {
        Some(rev) => rev.chars().take(12).collect(),
        None => {
            let hash = locked.nar_hash.trim_start_matches(HASH_PREFIX);
            format!("{}{}", HASH_PREFIX, &hash[..hash.len().min(12)])
        }
    }
}
