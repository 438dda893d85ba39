//! `berth init` command

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::InitArgs;
use crate::{display_path, GlobalOptions};
use berth::ops::{init_project, InitOptions};
use berth::util::Status;

pub fn execute(args: InitArgs, global_opts: &GlobalOptions) -> Result<()> {
    let path = args.path.unwrap_or_else(|| PathBuf::from("."));

    let opts = InitOptions { name: args.name };
    let manifest_path = init_project(&path, &opts)?;

    global_opts
        .shell
        .status(Status::Created, display_path(&manifest_path));

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::cli::InitArgs;
    use clap::Parser;
    use std::path::PathBuf;

    fn parse_init_args(args: &[&str]) -> InitArgs {
        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            init: InitArgs,
        }
        TestCli::parse_from(args).init
    }

    #[test]
    fn test_init_args_defaults() {
        let args = parse_init_args(&["test"]);
        assert!(args.name.is_none());
        assert!(args.path.is_none());
    }

    #[test]
    fn test_init_with_name_and_path() {
        let args = parse_init_args(&["test", "--name", "viewer", "../viewer"]);
        assert_eq!(args.name.as_deref(), Some("viewer"));
        assert_eq!(args.path, Some(PathBuf::from("../viewer")));
    }
}
