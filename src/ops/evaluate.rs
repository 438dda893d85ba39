//! Implementation of output evaluation.

use anyhow::{bail, Context, Result};

use crate::core::platform::Platform;
use crate::core::Workspace;
use crate::eval::{evaluate_platform, for_each_system, load_platforms, Outputs};
use crate::ops::resolve::{resolve_workspace_with_opts, ResolveOptions};
use crate::util::shell::Progress;

/// Options for evaluation.
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// How inputs are resolved first
    pub resolve: ResolveOptions,

    /// Evaluate only these platforms (empty = every declared platform)
    pub systems: Vec<Platform>,

    /// Worker threads (None = config, then one per CPU)
    pub jobs: Option<usize>,
}

impl EvalOptions {
    /// Evaluate a single platform.
    pub fn for_system(system: Platform) -> Self {
        EvalOptions {
            systems: vec![system],
            ..Default::default()
        }
    }
}

/// Resolve inputs and evaluate every declared platform.
///
/// Resolution failures and an unreadable platform list abort the whole
/// evaluation. Anything that goes wrong for one platform lands in that
/// platform's entry of the returned [`Outputs`].
pub fn evaluate(ws: &Workspace, opts: &EvalOptions) -> Result<Outputs> {
    evaluate_with_progress(ws, opts, &())
}

/// Observer of a running evaluation.
///
/// `finished` is called on the evaluation workers, in completion order.
pub trait EvalProgress: Sync {
    fn started(&self, _total: usize) {}
    fn finished(&self, _platform: &Platform) {}
}

impl EvalProgress for () {}

impl EvalProgress for Progress {
    fn started(&self, total: usize) {
        self.set_length(total as u64);
    }

    fn finished(&self, _platform: &Platform) {
        self.inc(1);
    }
}

/// Like [`evaluate`], reporting each platform to `progress` as it finishes.
pub fn evaluate_with_progress(
    ws: &Workspace,
    opts: &EvalOptions,
    progress: &dyn EvalProgress,
) -> Result<Outputs> {
    let manifest = ws.manifest();
    let config = manifest.evaluation_config()?;

    let resolution = resolve_workspace_with_opts(ws, &opts.resolve)?;
    let inputs = &resolution.inputs;

    let declared = load_platforms(config.systems, inputs)?;
    let platforms = select_platforms(&declared, &opts.systems)?;

    let packages_snapshot = inputs.snapshot(config.packages_input).with_context(|| {
        format!(
            "packages input `{}` was not resolved",
            config.packages_input
        )
    })?;
    let store_dir = ws.store_dir();

    let jobs = opts.jobs.or(ws.config().eval.jobs).unwrap_or(0);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("failed to start evaluation workers")?;

    tracing::info!("Evaluating {} platform(s)", platforms.len());
    progress.started(platforms.len());
    let systems = pool.install(|| {
        for_each_system(&platforms, |platform| {
            let result = evaluate_platform(packages_snapshot, platform, &store_dir, &config);
            progress.finished(platform);
            result
        })
    });

    let outputs = Outputs::new(systems);
    for error in outputs.errors() {
        tracing::debug!("{}", error);
    }
    Ok(outputs)
}

/// Restrict the declared platforms to the requested ones.
fn select_platforms(declared: &[Platform], requested: &[Platform]) -> Result<Vec<Platform>> {
    if requested.is_empty() {
        return Ok(declared.to_vec());
    }

    for platform in requested {
        if !declared.contains(platform) {
            let list: Vec<&str> = declared.iter().map(Platform::as_str).collect();
            bail!(
                "platform `{}` is not declared by this project (declared: {})",
                platform,
                if list.is_empty() {
                    "none".to_string()
                } else {
                    list.join(", ")
                }
            );
        }
    }
    Ok(requested.to_vec())
}
