//! Centralized shell output and progress management.
//!
//! All status output of the CLI goes through [`Shell`] as status lines
//! (`{status:>12} {message}`) on stderr. Progress bars and timing spans are
//! built on top of it.
//!
//! Results meant for the user are printed by the command itself on stdout.

use std::fmt::Display;
use std::io::{self, IsTerminal};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: errors only, no progress
    Quiet,
    /// Default: status messages + progress bars
    #[default]
    Normal,
    /// --verbose: immediate status lines, no progress bars
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Always use ANSI colors.
    Always,
    /// Never use ANSI colors.
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice '{}'; expected 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success statuses (green)
    Added,
    Created,
    Finished,
    Locked,
    Updated,
    Removed,

    // In-progress statuses (cyan)
    Fetching,
    Resolving,
    Evaluating,
    Formatting,
    Checking,
    Entering,

    // Info statuses (blue)
    Info,

    // Warning statuses (yellow)
    Skipped,
    Warning,

    // Error status (red)
    Error,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Added => "Added",
            Status::Created => "Created",
            Status::Finished => "Finished",
            Status::Locked => "Locked",
            Status::Updated => "Updated",
            Status::Removed => "Removed",
            Status::Fetching => "Fetching",
            Status::Resolving => "Resolving",
            Status::Evaluating => "Evaluating",
            Status::Formatting => "Formatting",
            Status::Checking => "Checking",
            Status::Entering => "Entering",
            Status::Info => "Info",
            Status::Skipped => "Skipped",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Added
            | Status::Created
            | Status::Finished
            | Status::Locked
            | Status::Updated
            | Status::Removed => "\x1b[1;32m",
            Status::Fetching
            | Status::Resolving
            | Status::Evaluating
            | Status::Formatting
            | Status::Checking
            | Status::Entering => "\x1b[1;36m",
            Status::Info => "\x1b[1;34m",
            Status::Skipped | Status::Warning => "\x1b[1;33m",
            Status::Error => "\x1b[1;31m",
        }
    }
}

/// Width statuses are right-aligned to.
const STATUS_WIDTH: usize = 12;

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    verbosity: Verbosity,
    use_color: bool,
}

impl Shell {
    /// Create a new shell.
    pub fn new(verbosity: Verbosity, color: ColorChoice) -> Self {
        let use_color = match color {
            ColorChoice::Auto => io::stderr().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        };

        Shell {
            verbosity,
            use_color,
        }
    }

    /// Create a shell from CLI flags. Quiet wins over verbose.
    pub fn from_flags(quiet: bool, verbose: bool, color: ColorChoice) -> Self {
        let verbosity = if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };
        Shell::new(verbosity, color)
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Check if colors are enabled.
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Print a status message. In quiet mode only errors are printed.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_quiet() && status != Status::Error {
            return;
        }

        eprintln!("{} {}", self.format_status(status), msg);
    }

    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    pub fn error(&self, msg: impl Display) {
        self.status(Status::Error, msg);
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();

        if self.use_color {
            format!(
                "{}{:>width$}\x1b[0m",
                status.color_code(),
                text,
                width = STATUS_WIDTH
            )
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }

    /// Create a scoped span for timing operations.
    ///
    /// The start line is only printed if the operation outlasts a short delay
    /// (or immediately in verbose mode).
    pub fn span(self: &Arc<Self>, status: Status, msg: impl Display) -> Span {
        Span::new(Arc::clone(self), status, msg.to_string())
    }

    /// Create a progress bar. Nothing is drawn in quiet or verbose mode.
    pub fn progress(self: &Arc<Self>, total: u64, msg: impl Display) -> Progress {
        Progress::new(Arc::clone(self), total, msg.to_string())
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(Verbosity::Normal, ColorChoice::Auto)
    }
}

/// A scoped timing span with delayed start output.
pub struct Span {
    shell: Arc<Shell>,
    status: Status,
    message: String,
    start: Instant,
    start_printed: bool,
    finished: bool,
}

impl Span {
    const DEFAULT_DELAY: Duration = Duration::from_millis(200);

    fn new(shell: Arc<Shell>, status: Status, message: String) -> Self {
        let start_printed = shell.is_verbose();
        if start_printed {
            shell.status(status, &message);
        }

        Span {
            shell,
            status,
            message,
            start: Instant::now(),
            start_printed,
            finished: false,
        }
    }

    /// Mark the span as finished with a custom message.
    pub fn finish_with_message(mut self, msg: impl Display) {
        self.finished = true;
        if !self.shell.is_quiet() {
            self.shell.status(
                Status::Finished,
                format!("{} in {}", msg, format_duration(self.start.elapsed())),
            );
        }
    }

    /// Get elapsed time.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if self.finished || self.shell.is_quiet() {
            return;
        }

        let elapsed = self.start.elapsed();
        if self.start_printed || elapsed > Self::DEFAULT_DELAY {
            self.shell
                .status(Status::Finished, format!("in {}", format_duration(elapsed)));
        }
    }
}

/// Progress bar that respects verbosity.
///
/// Every method takes `&self` so evaluation workers can share one bar. The
/// bar is only drawn once a length above one is known.
pub struct Progress {
    shell: Arc<Shell>,
    pb: OnceLock<ProgressBar>,
    total: AtomicU64,
    current: AtomicU64,
    message: String,
}

impl Progress {
    fn new(shell: Arc<Shell>, total: u64, message: String) -> Self {
        let progress = Progress {
            shell,
            pb: OnceLock::new(),
            total: AtomicU64::new(0),
            current: AtomicU64::new(0),
            message,
        };
        progress.set_length(total);
        progress
    }

    /// Set the number of steps.
    pub fn set_length(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
        if self.shell.verbosity() != Verbosity::Normal || total <= 1 {
            return;
        }

        let pb = self.pb.get_or_init(|| {
            let pb = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len}")
            {
                pb.set_style(style.progress_chars("=> "));
            }
            pb.set_message(self.message.clone());
            pb
        });
        pb.set_length(total);
    }

    /// Advance the bar. In verbose mode each step is printed instead.
    pub fn inc(&self, delta: u64) {
        let current = self.current.fetch_add(delta, Ordering::Relaxed) + delta;

        if let Some(pb) = self.pb.get() {
            pb.inc(delta);
        }
        if self.shell.is_verbose() {
            let total = self.total.load(Ordering::Relaxed);
            eprintln!("  {} [{}/{}]", self.message, current, total);
        }
    }

    /// Clear the bar.
    pub fn finish(&self) {
        if let Some(pb) = self.pb.get() {
            pb.finish_and_clear();
        }
    }
}

/// Format a duration in a human-readable way.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(verbosity: Verbosity) -> Shell {
        Shell::new(verbosity, ColorChoice::Never)
    }

    #[test]
    fn test_color_choice_parse() {
        assert_eq!("auto".parse::<ColorChoice>().unwrap(), ColorChoice::Auto);
        assert_eq!("Always".parse::<ColorChoice>().unwrap(), ColorChoice::Always);
        assert_eq!("never".parse::<ColorChoice>().unwrap(), ColorChoice::Never);
        assert!("sometimes".parse::<ColorChoice>().is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "0.50s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_status_is_right_aligned() {
        let shell = plain(Verbosity::Normal);

        let formatted = shell.format_status(Status::Evaluating);
        assert_eq!(formatted, "  Evaluating");
        assert_eq!(shell.format_status(Status::Locked).len(), STATUS_WIDTH);

        let colored = Shell::new(Verbosity::Normal, ColorChoice::Always);
        assert!(colored.format_status(Status::Error).starts_with("\x1b[1;31m"));
    }

    #[test]
    fn test_quiet_wins_over_verbose() {
        assert!(Shell::from_flags(true, true, ColorChoice::Never).is_quiet());
        assert!(Shell::from_flags(false, true, ColorChoice::Never).is_verbose());
        assert_eq!(
            Shell::from_flags(false, false, ColorChoice::Never).verbosity(),
            Verbosity::Normal
        );
    }

    #[test]
    fn test_progress_is_shared_across_threads() {
        let shell = Arc::new(plain(Verbosity::Quiet));
        let progress = shell.progress(8, "Evaluating");
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    progress.inc(1);
                    progress.inc(1);
                });
            }
        });
        assert_eq!(progress.current.load(Ordering::Relaxed), 8);
        progress.finish();
    }
}
