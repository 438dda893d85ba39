//! `berth add` command

use anyhow::Result;

use crate::cli::AddArgs;
use crate::GlobalOptions;
use berth::ops::{add_input, parse_follows, AddOptions};
use berth::util::{GlobalContext, Status};

pub fn execute(args: AddArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let ctx = GlobalContext::new()?;

    let manifest_path = ctx.find_manifest()?;

    let opts = AddOptions {
        name: args.name,
        url: args.url,
        follows: parse_follows(&args.follows)?,
    };

    add_input(&manifest_path, &opts)?;

    shell.status(Status::Added, format!("{} ({})", opts.name, opts.url));
    for (nested, target) in &opts.follows {
        shell.note(format!("{}/{} follows {}", opts.name, nested, target));
    }

    Ok(())
}
