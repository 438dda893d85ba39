//! Berth CLI - reproducible development environments

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use berth::core::platform::Platform;
use berth::core::{ManifestError, Workspace};
use berth::eval::EvalError;
use berth::ops::ResolveOptions;
use berth::resolver::ResolveError;
use berth::util::diagnostic::{
    emit, emit_error, suggestions, StaleLockfileError, TomlSyntaxError, UnknownShellError,
};
use berth::util::fs::relative_path;
use berth::util::{ColorChoice, GlobalContext, Shell};
use cli::{Cli, Commands};

/// Flags shared by every command.
pub struct GlobalOptions {
    pub shell: Arc<Shell>,
    pub offline: bool,
    pub locked: bool,
    pub color: bool,
}

impl GlobalOptions {
    /// Load the workspace containing the current directory.
    pub fn workspace(&self) -> Result<Workspace> {
        let mut ctx = GlobalContext::new()?;
        ctx.set_offline(self.offline);
        ctx.set_verbose(self.shell.is_verbose());

        let manifest_path = ctx.find_manifest()?;
        Workspace::new(&manifest_path, &ctx)
    }

    /// Resolution options implied by the global flags.
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            locked: self.locked,
            ..Default::default()
        }
    }

    /// Platform named by `--system`, or the host.
    pub fn system(&self, system: Option<&str>) -> Result<Platform> {
        match system {
            Some(s) => Ok(Platform::new(s)?),
            None => Ok(Platform::host()),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stderr().is_terminal(),
    };

    if let Err(e) = run(cli, color) {
        report(e, color);
        std::process::exit(1);
    }
}

fn run(cli: Cli, color: bool) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("berth=debug")
    } else if cli.quiet {
        EnvFilter::new("berth=error")
    } else {
        EnvFilter::new("berth=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let global = GlobalOptions {
        shell: Arc::new(Shell::from_flags(cli.quiet, cli.verbose, cli.color)),
        offline: cli.offline,
        locked: cli.locked,
        color,
    };

    // Execute command
    match cli.command {
        Commands::Init(args) => commands::init::execute(args, &global),
        Commands::Add(args) => commands::add::execute(args, &global),
        Commands::Remove(args) => commands::remove::execute(args, &global),
        Commands::Lock => commands::lock::execute(&global),
        Commands::Update(args) => commands::update::execute(args, &global),
        Commands::Inputs(args) => commands::inputs::execute(args, &global),
        Commands::Show(args) => commands::show::execute(args, &global),
        Commands::Fmt(args) => commands::fmt::execute(args, &global),
        Commands::Check(args) => commands::check::execute(args, &global),
        Commands::Develop(args) => commands::develop::execute(args, &global),
        Commands::PrintDevEnv(args) => commands::print_dev_env::execute(args, &global),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Print an error, using the richest rendering its type offers.
fn report(e: anyhow::Error, color: bool) {
    if let Some(err) = e.downcast_ref::<ResolveError>() {
        emit(&err.to_diagnostic(), color);
        return;
    }
    if let Some(err) = e.downcast_ref::<EvalError>() {
        emit(&err.to_diagnostic(), color);
        return;
    }
    if let Some(err) = e.downcast_ref::<ManifestError>() {
        emit_error(&err.to_string(), &[], &[suggestions::NO_MANIFEST], color);
        return;
    }

    let e = match e.downcast::<TomlSyntaxError>() {
        Ok(err) => return eprintln!("{:?}", miette::Report::new(err)),
        Err(e) => e,
    };
    let e = match e.downcast::<StaleLockfileError>() {
        Ok(err) => return eprintln!("{:?}", miette::Report::new(err)),
        Err(e) => e,
    };
    let e = match e.downcast::<UnknownShellError>() {
        Ok(err) => return eprintln!("{:?}", miette::Report::new(err)),
        Err(e) => e,
    };

    eprintln!("error: {:#}", e);
}

/// Display a path relative to the current directory when possible.
pub fn display_path(path: &Path) -> String {
    let Ok(cwd) = std::env::current_dir() else {
        return path.display().to_string();
    };
    let rel = relative_path(&cwd, path);
    if rel.as_os_str().is_empty() || rel.starts_with("..") {
        path.display().to_string()
    } else {
        rel.display().to_string()
    }
}
