//! `berth update` command

use anyhow::Result;

use crate::cli::UpdateArgs;
use crate::GlobalOptions;
use berth::ops::{update, LockChange, UpdateOptions};
use berth::util::Status;

pub fn execute(args: UpdateArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let ws = global_opts.workspace()?;

    let opts = UpdateOptions {
        inputs: args.inputs,
        dry_run: args.dry_run,
    };

    let result = update(&ws, &opts)?;

    if result.changes.is_empty() {
        shell.status(Status::Finished, "all inputs are up to date");
        return Ok(());
    }

    for change in &result.changes {
        let status = match change {
            LockChange::Added { .. } => Status::Added,
            LockChange::Removed { .. } => Status::Removed,
            LockChange::Updated { .. } => Status::Updated,
        };
        if args.dry_run {
            shell.status(Status::Info, format!("Would update {}", change));
        } else {
            shell.status(status, change);
        }
    }

    if result.resolution.written {
        shell.status(
            Status::Locked,
            format!("{} change(s) written", result.changes.len()),
        );
    }

    Ok(())
}
