//! `berth remove` command

use anyhow::Result;

use crate::cli::RemoveArgs;
use crate::GlobalOptions;
use berth::ops::remove_input;
use berth::util::{GlobalContext, Status};

pub fn execute(args: RemoveArgs, global_opts: &GlobalOptions) -> Result<()> {
    let ctx = GlobalContext::new()?;

    let manifest_path = ctx.find_manifest()?;

    remove_input(&manifest_path, &args.name)?;

    global_opts.shell.status(Status::Removed, &args.name);

    Ok(())
}
