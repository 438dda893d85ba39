//! `berth print-dev-env` command

use anyhow::Result;

use crate::cli::PrintDevEnvArgs;
use crate::GlobalOptions;
use berth::ops::{dev_shell, format_dev_env, DevelopOptions};

pub fn execute(args: PrintDevEnvArgs, global_opts: &GlobalOptions) -> Result<()> {
    let ws = global_opts.workspace()?;

    let mut opts = DevelopOptions::new(global_opts.system(args.system.system.as_deref())?);
    opts.shell = args.shell;
    opts.resolve = global_opts.resolve_options();

    let spec = dev_shell(&ws, &opts)?;
    let path = std::env::var("PATH").ok();
    let rendered = format_dev_env(&spec, path.as_deref(), args.json)?;
    if args.json {
        println!("{}", rendered);
    } else {
        print!("{}", rendered);
    }

    Ok(())
}
