//! `berth check` command

use anyhow::{bail, Result};

use crate::cli::CheckArgs;
use crate::GlobalOptions;
use berth::eval::FORMATTING_CHECK;
use berth::ops::{check, FmtOptions};
use berth::util::Status;

pub fn execute(args: CheckArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let ws = global_opts.workspace()?;

    let mut opts = FmtOptions::new(global_opts.system(args.system.system.as_deref())?);
    opts.resolve = global_opts.resolve_options();

    let name = args.name.as_deref().unwrap_or(FORMATTING_CHECK);
    shell.status(Status::Checking, format!("{} ({})", name, opts.system));
    let report = check(&ws, args.name.as_deref(), &opts)?;

    if report.is_clean() {
        shell.status(
            Status::Finished,
            format!("{} file(s) checked, all clean", report.checked),
        );
        return Ok(());
    }

    for path in &report.violations {
        println!("{}", path.display());
    }
    bail!(
        "check `{}` failed: {} of {} file(s) need formatting",
        name,
        report.violations.len(),
        report.checked
    )
}

#[cfg(test)]
mod tests {
    use crate::cli::CheckArgs;
    use clap::Parser;

    fn parse_check_args(args: &[&str]) -> CheckArgs {
        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            check: CheckArgs,
        }
        TestCli::parse_from(args).check
    }

    #[test]
    fn test_check_defaults_to_host() {
        let args = parse_check_args(&["test"]);
        assert!(args.name.is_none());
        assert!(args.system.system.is_none());
    }

    #[test]
    fn test_check_named_with_system() {
        let args = parse_check_args(&["test", "formatting", "--system", "aarch64-darwin"]);
        assert_eq!(args.name.as_deref(), Some("formatting"));
        assert_eq!(args.system.system.as_deref(), Some("aarch64-darwin"));
    }
}
