//! Implementation of `berth fmt` and `berth check`.

use anyhow::{anyhow, Result};

use crate::compose::{CheckReport, FormatReport};
use crate::core::platform::Platform;
use crate::core::Workspace;
use crate::eval::FORMATTING_CHECK;
use crate::ops::evaluate::{evaluate, EvalOptions};
use crate::ops::resolve::ResolveOptions;

/// Options shared by fmt and check.
#[derive(Debug, Clone)]
pub struct FmtOptions {
    /// Platform whose formatter runs
    pub system: Platform,

    /// How inputs are resolved first
    pub resolve: ResolveOptions,
}

impl FmtOptions {
    pub fn new(system: Platform) -> Self {
        FmtOptions {
            system,
            resolve: ResolveOptions::default(),
        }
    }

    fn eval_options(&self) -> EvalOptions {
        EvalOptions {
            resolve: self.resolve.clone(),
            systems: vec![self.system.clone()],
            jobs: Some(1),
        }
    }
}

/// Rewrite every matching file of the project in place.
pub fn fmt(ws: &Workspace, opts: &FmtOptions) -> Result<FormatReport> {
    let outputs = evaluate(ws, &opts.eval_options())?;
    let formatter = outputs
        .formatter(&opts.system)
        .ok_or_else(|| anyhow!("platform `{}` was not evaluated", opts.system))?
        .map_err(|e| e.clone())?;

    tracing::info!(
        "Running {} formatter engine(s) for {}",
        formatter.engines().len(),
        opts.system
    );
    formatter.run(ws.root())
}

/// Run a named check. Files are never modified.
pub fn check(ws: &Workspace, name: Option<&str>, opts: &FmtOptions) -> Result<CheckReport> {
    let name = name.unwrap_or(FORMATTING_CHECK);
    let outputs = evaluate(ws, &opts.eval_options())?;
    let check = outputs
        .check(&opts.system, name)
        .ok_or_else(|| anyhow!("no check named `{}` (available: {})", name, FORMATTING_CHECK))?
        .map_err(|e| e.clone())?;

    check.run(ws.root())
}
