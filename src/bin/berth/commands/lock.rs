//! `berth lock` command

use anyhow::Result;

use crate::{display_path, GlobalOptions};
use berth::ops::resolve_workspace_with_opts;
use berth::util::Status;

pub fn execute(global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let ws = global_opts.workspace()?;

    let span = shell.span(Status::Resolving, "inputs");
    let resolution = resolve_workspace_with_opts(&ws, &global_opts.resolve_options())?;
    drop(span);

    let count = resolution.lockfile.nodes.len().saturating_sub(1);
    if resolution.written {
        shell.status(
            Status::Locked,
            format!("{} input(s) in {}", count, display_path(&ws.lockfile_path())),
        );
    } else {
        shell.status(
            Status::Finished,
            format!("{} is up to date", display_path(&ws.lockfile_path())),
        );
    }

    Ok(())
}
