//! Implementation of `berth develop` and `berth print-dev-env`.

use std::process::ExitStatus;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use crate::compose::ShellSpec;
use crate::core::manifest::DEFAULT_SHELL;
use crate::core::platform::Platform;
use crate::core::Workspace;
use crate::ops::evaluate::{evaluate, EvalOptions};
use crate::ops::resolve::ResolveOptions;
use crate::util::diagnostic::UnknownShellError;
use crate::util::process::{find_interactive_shell, ProcessBuilder};

/// Options for selecting a dev shell.
#[derive(Debug, Clone)]
pub struct DevelopOptions {
    /// Shell name (None = `default`)
    pub shell: Option<String>,

    /// Platform whose shell is composed
    pub system: Platform,

    /// Command to run instead of an interactive shell
    pub command: Vec<String>,

    /// How inputs are resolved first
    pub resolve: ResolveOptions,
}

impl DevelopOptions {
    pub fn new(system: Platform) -> Self {
        DevelopOptions {
            shell: None,
            system,
            command: Vec::new(),
            resolve: ResolveOptions::default(),
        }
    }

    fn shell_name(&self) -> &str {
        self.shell.as_deref().unwrap_or(DEFAULT_SHELL)
    }
}

/// Evaluate and return one dev shell.
pub fn dev_shell(ws: &Workspace, opts: &DevelopOptions) -> Result<ShellSpec> {
    let name = opts.shell_name();
    let declared = &ws.manifest().dev_shells;
    if !declared.contains_key(name) {
        let available = (!declared.is_empty()).then(|| {
            let names: Vec<&str> = declared.keys().map(String::as_str).collect();
            format!("available shells: {}", names.join(", "))
        });
        return Err(UnknownShellError {
            name: name.to_string(),
            available,
        }
        .into());
    }

    let outputs = evaluate(
        ws,
        &EvalOptions {
            resolve: opts.resolve.clone(),
            systems: vec![opts.system.clone()],
            jobs: Some(1),
        },
    )?;
    let spec = outputs
        .dev_shell(&opts.system, name)
        .ok_or_else(|| anyhow!("dev shell `{}` was not evaluated for {}", name, opts.system))?
        .map_err(|e| e.clone())?;
    Ok(spec.clone())
}

/// Environment changes the shell applies on top of the caller's.
pub fn shell_env(spec: &ShellSpec, existing_path: Option<&str>) -> Vec<(&'static str, String)> {
    let mut env = vec![("PATH", spec.activated_path(existing_path))];
    env.extend(spec.env());
    env
}

/// Enter a dev shell, or run a command inside it.
///
/// A command is executed directly with its arguments untouched; the
/// activated `PATH` is used to find it. Without one, the user's interactive
/// shell is started instead.
pub fn develop(ws: &Workspace, opts: &DevelopOptions) -> Result<ExitStatus> {
    let spec = dev_shell(ws, opts)?;
    let path = std::env::var("PATH").ok();

    let mut cmd = match opts.command.split_first() {
        Some((program, args)) => ProcessBuilder::new(program).args(args),
        None => {
            let shell = find_interactive_shell()
                .ok_or_else(|| anyhow!("no interactive shell found (set $SHELL)"))?;
            ProcessBuilder::new(shell)
        }
    };
    cmd = cmd.cwd(ws.root());
    for (key, value) in shell_env(&spec, path.as_deref()) {
        cmd = cmd.env(key, value);
    }
    cmd = cmd.env("BERTH_SHELL", opts.shell_name());

    tracing::debug!("Entering {}", cmd.display_command());
    cmd.status().with_context(|| {
        format!(
            "failed to run `{}` in dev shell `{}`",
            cmd.display_command(),
            opts.shell_name()
        )
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DevEnvJson<'a> {
    #[serde(flatten)]
    spec: &'a ShellSpec,
    variables: Vec<(&'static str, String)>,
}

/// Render the shell environment as `export` lines or JSON.
pub fn format_dev_env(spec: &ShellSpec, existing_path: Option<&str>, json: bool) -> Result<String> {
    let env = shell_env(spec, existing_path);
    if json {
        let view = DevEnvJson {
            spec,
            variables: env,
        };
        return serde_json::to_string_pretty(&view).context("failed to serialize dev env");
    }

    let mut out = String::new();
    for (key, value) in env {
        out.push_str(&format!("export {}={}\n", key, shell_quote(&value)));
    }
    Ok(out)
}

/// Single-quote a value for POSIX shells.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
