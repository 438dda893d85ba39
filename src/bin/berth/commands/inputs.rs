//! `berth inputs` command

use anyhow::{Context, Result};

use crate::cli::InputsArgs;
use crate::GlobalOptions;
use berth::ops::{format_input_tree, input_tree_json, resolve_workspace_with_opts};

pub fn execute(args: InputsArgs, global_opts: &GlobalOptions) -> Result<()> {
    let ws = global_opts.workspace()?;

    let resolution = resolve_workspace_with_opts(&ws, &global_opts.resolve_options())?;

    if args.json {
        let json = serde_json::to_string_pretty(&input_tree_json(&resolution.inputs))
            .context("failed to serialize input graph")?;
        println!("{}", json);
    } else {
        print!("{}", format_input_tree(&resolution.inputs, ws.manifest().name()));
    }

    Ok(())
}
