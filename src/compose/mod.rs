//! Per-platform artifact composition.
//!
//! Composers take one platform's package set and a manifest declaration and
//! produce an artifact: the formatter pipeline (and its check) or a dev shell.

pub mod engines;
pub mod formatter;
pub mod shell;

pub use engines::{EngineDef, EngineKind};
pub use formatter::{CheckReport, FormatReport, Formatter, FormattingCheck};
pub use shell::ShellSpec;
