//! `berth develop` command

use anyhow::Result;

use crate::cli::DevelopArgs;
use crate::GlobalOptions;
use berth::core::manifest::DEFAULT_SHELL;
use berth::ops::{develop, DevelopOptions};
use berth::util::Status;

pub fn execute(args: DevelopArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let ws = global_opts.workspace()?;

    let opts = DevelopOptions {
        shell: args.shell,
        system: global_opts.system(args.system.system.as_deref())?,
        command: args.command,
        resolve: global_opts.resolve_options(),
    };

    if opts.command.is_empty() {
        shell.status(
            Status::Entering,
            format!(
                "dev shell `{}` ({})",
                opts.shell.as_deref().unwrap_or(DEFAULT_SHELL),
                opts.system
            ),
        );
    }

    let status = develop(&ws, &opts)?;
    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }

    Ok(())
}
