//! User-friendly diagnostic messages.
//!
//! Every error shown to the user names what failed, what it was looking at, and
//! what to try next.

use std::fmt;
use std::path::{Path, PathBuf};

use miette::{Diagnostic as MietteDiagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when no manifest file is found.
    pub const NO_MANIFEST: &str = "Run `berth init` to create a new project";

    /// Suggestion when evaluation failed for some platform.
    pub const EVAL_FAILED: &str = "Run `berth show --verbose` for more details";
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let label = if color { "\x1b[1;31merror\x1b[0m" } else { "error" };
        output.push_str(&format!("{}: {}\n", label, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  → {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Syntax error in a TOML file, pointing at the offending span.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("invalid TOML in {file}: {message}")]
#[diagnostic(code(berth::manifest::syntax))]
pub struct TomlSyntaxError {
    pub file: String,
    pub message: String,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("here")]
    pub span: Option<SourceSpan>,
}

impl TomlSyntaxError {
    /// Build from a `toml` parse error.
    pub fn from_toml(path: &Path, content: &str, err: &toml::de::Error) -> Self {
        let file = path.display().to_string();
        TomlSyntaxError {
            message: err.message().to_string(),
            src: NamedSource::new(&file, content.to_string()),
            span: err.span().map(|r| SourceSpan::from(r.start..r.end)),
            file,
        }
    }
}

/// The lockfile no longer matches the manifest.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("Berth.lock is out of date with Berth.toml")]
#[diagnostic(
    code(berth::lock::stale),
    help("Run `berth lock` to update it, or drop `--locked`")
)]
pub struct StaleLockfileError;

/// Unknown dev shell requested.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("no dev shell named `{name}`")]
#[diagnostic(code(berth::eval::unknown_shell))]
pub struct UnknownShellError {
    pub name: String,
    #[help]
    pub available: Option<String>,
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

/// Print an error message with context and suggestions.
pub fn emit_error(message: &str, context: &[&str], suggestions: &[&str], color: bool) {
    let mut diag = Diagnostic::error(message);
    for ctx in context {
        diag = diag.with_context(*ctx);
    }
    for sug in suggestions {
        diag = diag.with_suggestion(*sug);
    }
    emit(&diag, color);
}
