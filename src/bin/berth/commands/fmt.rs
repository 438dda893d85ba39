//! `berth fmt` command

use anyhow::Result;

use crate::cli::SystemArgs;
use crate::GlobalOptions;
use berth::ops::{fmt, FmtOptions};
use berth::util::Status;

pub fn execute(args: SystemArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let ws = global_opts.workspace()?;

    let mut opts = FmtOptions::new(global_opts.system(args.system.as_deref())?);
    opts.resolve = global_opts.resolve_options();

    let span = shell.span(
        Status::Formatting,
        format!("{} ({})", ws.manifest().name(), opts.system),
    );
    let report = fmt(&ws, &opts)?;

    for path in &report.changed {
        shell.note(format!("reformatted {}", path.display()));
    }
    span.finish_with_message(format!(
        "{} file(s) checked, {} reformatted",
        report.matched,
        report.changed.len()
    ));

    Ok(())
}
