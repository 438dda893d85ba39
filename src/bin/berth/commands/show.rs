//! `berth show` command

use anyhow::{bail, Context, Result};

use crate::cli::ShowArgs;
use crate::GlobalOptions;
use berth::eval::Outputs;
use berth::ops::{evaluate_with_progress, EvalOptions};
use berth::util::diagnostic::suggestions;

pub fn execute(args: ShowArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let ws = global_opts.workspace()?;

    let systems = match args.system.as_deref() {
        Some(s) => vec![global_opts.system(Some(s))?],
        None => Vec::new(),
    };
    let opts = EvalOptions {
        resolve: global_opts.resolve_options(),
        systems,
        jobs: args.jobs,
    };

    let progress = shell.progress(0, "Evaluating");
    let outputs = evaluate_with_progress(&ws, &opts, &progress)?;
    progress.finish();

    if args.json {
        let json = serde_json::to_string_pretty(&outputs).context("failed to serialize outputs")?;
        println!("{}", json);
    } else {
        print!("{}", render(&outputs));
    }

    let errors = outputs.errors();
    if errors.is_empty() {
        return Ok(());
    }
    for error in &errors {
        shell.error(error);
    }
    if !shell.is_verbose() {
        shell.note(suggestions::EVAL_FAILED);
    }
    bail!("{} output(s) failed to evaluate", errors.len())
}

/// Human-readable listing: one block per platform.
fn render(outputs: &Outputs) -> String {
    let mut out = String::new();
    for platform in outputs.platforms() {
        out.push_str(&format!("{}\n", platform));
        let entry = match outputs.platform(platform) {
            Some(Ok(entry)) => entry,
            Some(Err(_)) => {
                out.push_str("  (failed)\n");
                continue;
            }
            None => continue,
        };

        match &entry.formatter {
            Ok(formatter) => {
                let engines: Vec<&str> =
                    formatter.engines().iter().map(|e| e.name.as_str()).collect();
                out.push_str(&format!("  formatter: {}\n", engines.join(", ")));
            }
            Err(_) => out.push_str("  formatter: (failed)\n"),
        }
        for (name, check) in &entry.checks {
            let state = if check.is_ok() { "" } else { " (failed)" };
            out.push_str(&format!("  checks.{}{}\n", name, state));
        }
        for (name, shell) in &entry.dev_shells {
            match shell {
                Ok(spec) => out.push_str(&format!(
                    "  devShells.{}: {} package(s)\n",
                    name,
                    spec.packages.len() + spec.native_build_inputs.len()
                )),
                Err(_) => out.push_str(&format!("  devShells.{} (failed)\n", name)),
            }
        }
    }
    out
}
