//! Formatter pipeline and its read-only check.
//!
//! Composition binds every engine of the roster to a program in the platform's
//! package set. Running walks the project tree, hands each engine the files its
//! includes match, and runs the engines in roster order.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::Pattern;
use serde::Serialize;

use crate::compose::engines::{EngineDef, EngineKind, Invocation};
use crate::core::manifest::FormatterDecl;
use crate::core::package_set::PackageSet;
use crate::eval::errors::EvalError;
use crate::util::fs::{ensure_dir, walk_files};
use crate::util::hash::sha256_file;
use crate::util::process::ProcessBuilder;

/// Files handed to a single batch invocation.
const BATCH_SIZE: usize = 256;

/// An engine bound to a concrete program.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedEngine {
    pub name: EngineKind,
    pub package: String,
    pub program: PathBuf,
}

impl ResolvedEngine {
    fn def(&self) -> &'static EngineDef {
        self.name.def()
    }

    /// Check whether this engine applies to a file.
    ///
    /// Includes are fixed per engine and always valid globs.
    pub fn matches(&self, rel_path: &Path) -> bool {
        let Some(name) = rel_path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.def()
            .includes
            .iter()
            .filter_map(|glob| Pattern::new(glob).ok())
            .any(|p| p.matches(name))
    }

    fn run(&self, root: &Path, files: &[&Path]) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }

        let def = self.def();
        let batches: Vec<&[&Path]> = match def.invocation {
            Invocation::Batch => files.chunks(BATCH_SIZE).collect(),
            Invocation::PerFile => files.chunks(1).collect(),
        };

        for batch in batches {
            let cmd = ProcessBuilder::new(&self.program)
                .args(def.fix_args)
                .args(batch.iter())
                .cwd(root);
            tracing::debug!("Running {}", cmd.display_command());
            cmd.exec_and_check()
                .with_context(|| format!("formatter engine `{}` failed", self.name))?;
        }
        Ok(())
    }
}

/// The formatter pipeline of one platform.
#[derive(Debug, Clone, Serialize)]
pub struct Formatter {
    engines: Vec<ResolvedEngine>,
    excludes: Vec<String>,
}

/// Result of running the pipeline in place.
#[derive(Debug, Clone, Default)]
pub struct FormatReport {
    /// Files handed to at least one engine
    pub matched: usize,
    /// Files whose content changed, relative to the root
    pub changed: Vec<PathBuf>,
}

/// Result of a formatting check.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    /// Files checked
    pub checked: usize,
    /// Files an engine would have changed, relative to the root
    pub violations: Vec<PathBuf>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

impl Formatter {
    /// Bind the roster to the package set.
    ///
    /// Fails on the first engine whose package is missing.
    pub fn compose(packages: &PackageSet, decl: &FormatterDecl) -> Result<Self, EvalError> {
        let mut engines = Vec::with_capacity(decl.engines.len());
        for kind in &decl.engines {
            let def = kind.def();
            let package =
                packages
                    .get(def.package)
                    .ok_or_else(|| EvalError::MissingFormatterEngine {
                        engine: kind.to_string(),
                        package: def.package.to_string(),
                    })?;
            engines.push(ResolvedEngine {
                name: *kind,
                package: package.name.clone(),
                program: package.bin_dir().join(def.program),
            });
        }

        Ok(Formatter {
            engines,
            excludes: decl.excludes.clone(),
        })
    }

    /// Enabled engines, in run order.
    pub fn engines(&self) -> &[ResolvedEngine] {
        &self.engines
    }

    fn exclude_patterns(&self) -> Result<Vec<Pattern>> {
        self.excludes
            .iter()
            .map(|p| Pattern::new(p).with_context(|| format!("invalid exclude pattern `{}`", p)))
            .collect()
    }

    /// Config file names any engine of the roster reads.
    fn config_names(&self) -> BTreeSet<&'static str> {
        self.engines
            .iter()
            .flat_map(|e| e.def().config_files.iter().copied())
            .collect()
    }

    /// Files under `root` at least one engine applies to, relative and sorted.
    pub fn matched_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let excludes = self.exclude_patterns()?;
        let files = relative_files(root)?
            .into_iter()
            .filter(|rel| !excludes.iter().any(|p| p.matches_path(rel)))
            .filter(|rel| self.engines.iter().any(|e| e.matches(rel)))
            .collect();
        Ok(files)
    }

    /// Run every engine over `files` (relative to `root`), in roster order.
    fn run_engines(&self, root: &Path, files: &[PathBuf]) -> Result<()> {
        for engine in &self.engines {
            let selected: Vec<&Path> = files
                .iter()
                .map(PathBuf::as_path)
                .filter(|f| engine.matches(f))
                .collect();
            tracing::debug!("{}: {} file(s)", engine.name, selected.len());
            engine.run(root, &selected)?;
        }
        Ok(())
    }

    /// Rewrite matching files under `root` in place.
    pub fn run(&self, root: &Path) -> Result<FormatReport> {
        let files = self.matched_files(root)?;
        let before = digests(root, &files)?;
        self.run_engines(root, &files)?;
        let after = digests(root, &files)?;

        let changed = files
            .iter()
            .zip(before.iter().zip(after.iter()))
            .filter(|(_, (b, a))| b != a)
            .map(|(f, _)| f.clone())
            .collect();

        Ok(FormatReport {
            matched: files.len(),
            changed,
        })
    }
}

/// The read-only variant of a [`Formatter`].
#[derive(Debug, Clone, Serialize)]
pub struct FormattingCheck {
    formatter: Formatter,
}

impl FormattingCheck {
    pub fn new(formatter: Formatter) -> Self {
        FormattingCheck { formatter }
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    /// Report files the pipeline would change. Never writes under `root`.
    ///
    /// The engines run over a scratch copy holding the matched files and every
    /// engine config file of the project, at any depth. Engines also look for
    /// config above the project, so the nearest such config of an engine with
    /// none at the project root is copied to the scratch root.
    pub fn run(&self, root: &Path) -> Result<CheckReport> {
        let files = self.formatter.matched_files(root)?;
        let scratch = tempfile::Builder::new()
            .prefix("berth-check-")
            .tempdir()
            .context("failed to create scratch directory")?;

        for file in &files {
            copy_into(root, scratch.path(), file)?;
        }

        let config_names = self.formatter.config_names();
        for rel in relative_files(root)? {
            let is_config = rel
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| config_names.contains(n));
            if is_config {
                copy_into(root, scratch.path(), &rel)?;
            }
        }
        for engine in &self.formatter.engines {
            if let Some(dir) = outer_config_dir(root, engine.def().config_files)? {
                for name in engine.def().config_files {
                    if dir.join(name).is_file() {
                        copy_into(&dir, scratch.path(), Path::new(name))?;
                    }
                }
            }
        }

        let before = digests(root, &files)?;
        self.formatter.run_engines(scratch.path(), &files)?;
        let after = digests(scratch.path(), &files)?;

        let violations = files
            .iter()
            .zip(before.iter().zip(after.iter()))
            .filter(|(_, (b, a))| b != a)
            .map(|(f, _)| f.clone())
            .collect();

        Ok(CheckReport {
            checked: files.len(),
            violations,
        })
    }
}

/// Every regular file under `root`, relative to it and sorted.
fn relative_files(root: &Path) -> Result<Vec<PathBuf>> {
    walk_files(root)?
        .into_iter()
        .map(|path| {
            path.strip_prefix(root)
                .map(Path::to_path_buf)
                .with_context(|| format!("{} escapes the project root", path.display()))
        })
        .collect()
}

/// Nearest directory above `root` holding one of `names`, unless `root` holds one.
fn outer_config_dir(root: &Path, names: &[&str]) -> Result<Option<PathBuf>> {
    let has_config = |dir: &Path| names.iter().any(|n| dir.join(n).is_file());
    if names.is_empty() || has_config(root) {
        return Ok(None);
    }
    let root = root
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", root.display()))?;
    Ok(root.ancestors().skip(1).find(|d| has_config(*d)).map(Path::to_path_buf))
}

fn copy_into(from_root: &Path, to_root: &Path, rel: &Path) -> Result<()> {
    let dest = to_root.join(rel);
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }
    std::fs::copy(from_root.join(rel), &dest)
        .with_context(|| format!("failed to copy {} for checking", rel.display()))?;
    Ok(())
}

fn digests(root: &Path, files: &[PathBuf]) -> Result<Vec<String>> {
    files.iter().map(|f| sha256_file(&root.join(f))).collect()
}
