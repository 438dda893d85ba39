//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;

use berth::util::ColorChoice;

/// Berth - reproducible development environments
#[derive(Parser)]
#[command(name = "berth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    /// Never touch the network; only cached snapshots are used
    #[arg(long, global = true, env = "BERTH_OFFLINE")]
    pub offline: bool,

    /// Require Berth.lock to be up to date
    #[arg(long, global = true)]
    pub locked: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter Berth.toml
    Init(InitArgs),

    /// Add an input to Berth.toml
    Add(AddArgs),

    /// Remove an input from Berth.toml
    Remove(RemoveArgs),

    /// Resolve inputs and write Berth.lock
    Lock,

    /// Re-resolve inputs, ignoring locked revisions
    Update(UpdateArgs),

    /// Display the resolved input graph
    Inputs(InputsArgs),

    /// Evaluate and list outputs for every platform
    Show(ShowArgs),

    /// Run the formatter over the project
    Fmt(SystemArgs),

    /// Run checks without modifying files
    Check(CheckArgs),

    /// Enter a development shell
    Develop(DevelopArgs),

    /// Print the environment of a development shell
    PrintDevEnv(PrintDevEnvArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Project name (defaults to directory name)
    #[arg(long)]
    pub name: Option<String>,

    /// Directory to initialize (defaults to current directory)
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct AddArgs {
    /// Input name
    pub name: String,

    /// Locator (path:, git+, github:, tarball+)
    pub url: String,

    /// Make a nested input reuse another: `nested=path/of/input`
    #[arg(long, value_name = "NAME=PATH")]
    pub follows: Vec<String>,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Input name to remove
    pub name: String,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Specific inputs to update (defaults to all)
    pub inputs: Vec<String>,

    /// Dry run - show what would be updated
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct InputsArgs {
    /// Print the graph as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Print outputs as JSON
    #[arg(long)]
    pub json: bool,

    /// Only evaluate this platform
    #[arg(long)]
    pub system: Option<String>,

    /// Number of platforms evaluated in parallel
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct SystemArgs {
    /// Platform to use (defaults to the host)
    #[arg(long)]
    pub system: Option<String>,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Check to run (defaults to `formatting`)
    pub name: Option<String>,

    #[command(flatten)]
    pub system: SystemArgs,
}

#[derive(Args)]
pub struct DevelopArgs {
    /// Shell to enter (defaults to `default`)
    pub shell: Option<String>,

    #[command(flatten)]
    pub system: SystemArgs,

    /// Run a command with its arguments in the environment instead of a shell
    #[arg(short = 'c', long = "command", num_args = 1.., allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Args)]
pub struct PrintDevEnvArgs {
    /// Shell to print (defaults to `default`)
    pub shell: Option<String>,

    #[command(flatten)]
    pub system: SystemArgs,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: CompletionShell,
}
