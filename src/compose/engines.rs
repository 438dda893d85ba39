//! Built-in formatter engines.
//!
//! The registry is static: a manifest can only name engines listed here, and
//! each engine always maps to the same package, program and invocation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A formatter engine berth knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    Nixfmt,
    Rustfmt,
    Deadnix,
    Statix,
}

/// How an engine takes its file arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// One process for many files
    Batch,
    /// One process per file
    PerFile,
}

/// Static description of an engine.
#[derive(Debug)]
pub struct EngineDef {
    pub kind: EngineKind,

    /// Package that provides the program
    pub package: &'static str,

    /// Executable under the package's `bin`
    pub program: &'static str,

    /// File-name globs the engine applies to
    pub includes: &'static [&'static str],

    /// Arguments placed before the file list
    pub fix_args: &'static [&'static str],

    pub invocation: Invocation,

    /// Project files that configure the engine; copied along in check mode
    pub config_files: &'static [&'static str],
}

static NIXFMT: EngineDef = EngineDef {
    kind: EngineKind::Nixfmt,
    package: "nixfmt-rfc-style",
    program: "nixfmt",
    includes: &["*.nix"],
    fix_args: &[],
    invocation: Invocation::Batch,
    config_files: &[],
};

static RUSTFMT: EngineDef = EngineDef {
    kind: EngineKind::Rustfmt,
    package: "rustfmt",
    program: "rustfmt",
    includes: &["*.rs"],
    fix_args: &["--edition", "2021"],
    invocation: Invocation::Batch,
    config_files: &["rustfmt.toml", ".rustfmt.toml"],
};

static DEADNIX: EngineDef = EngineDef {
    kind: EngineKind::Deadnix,
    package: "deadnix",
    program: "deadnix",
    includes: &["*.nix"],
    fix_args: &["--edit"],
    invocation: Invocation::Batch,
    config_files: &[],
};

static STATIX: EngineDef = EngineDef {
    kind: EngineKind::Statix,
    package: "statix",
    program: "statix",
    includes: &["*.nix"],
    fix_args: &["fix"],
    invocation: Invocation::PerFile,
    config_files: &["statix.toml"],
};

impl EngineKind {
    /// Every engine, in the order a default roster runs them.
    pub fn default_roster() -> &'static [EngineKind] {
        &[
            EngineKind::Nixfmt,
            EngineKind::Rustfmt,
            EngineKind::Deadnix,
            EngineKind::Statix,
        ]
    }

    /// The engine's static definition.
    pub fn def(&self) -> &'static EngineDef {
        match self {
            EngineKind::Nixfmt => &NIXFMT,
            EngineKind::Rustfmt => &RUSTFMT,
            EngineKind::Deadnix => &DEADNIX,
            EngineKind::Statix => &STATIX,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Nixfmt => "nixfmt",
            EngineKind::Rustfmt => "rustfmt",
            EngineKind::Deadnix => "deadnix",
            EngineKind::Statix => "statix",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EngineKind::default_roster()
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown formatter engine `{}`; expected one of: nixfmt, rustfmt, deadnix, statix",
                    s
                )
            })
    }
}
