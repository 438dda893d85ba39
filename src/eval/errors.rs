//! Evaluation error types and diagnostics.

use thiserror::Error;

use crate::core::platform::Platform;
use crate::util::diagnostic::Diagnostic;

/// Error while evaluating outputs for a platform.
///
/// Everything here is contained: it fails one platform, or one artifact of one
/// platform, never the whole evaluation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("platform {platform}: {source}")]
    PlatformEvaluationError {
        platform: Platform,
        #[source]
        source: Box<EvalError>,
    },

    #[error("formatter engine `{engine}` needs package `{package}`, which is not in the package set")]
    MissingFormatterEngine { engine: String, package: String },

    #[error("package `{name}` is not in the package set")]
    MissingPackage { name: String },

    #[error("package repository does not support this platform")]
    UnsupportedPlatform { supported: Vec<String> },

    #[error("invalid package catalog: {message}")]
    Catalog { message: String },
}

impl EvalError {
    /// Wrap an error as the failure of a whole platform.
    ///
    /// Already wrapped errors are returned as-is.
    pub fn for_platform(platform: &Platform, error: EvalError) -> Self {
        match error {
            wrapped @ EvalError::PlatformEvaluationError { .. } => wrapped,
            other => EvalError::PlatformEvaluationError {
                platform: platform.clone(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, with platform wrapping removed.
    pub fn root_cause(&self) -> &EvalError {
        match self {
            EvalError::PlatformEvaluationError { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            EvalError::PlatformEvaluationError { platform, source } => {
                let mut diag = source.to_diagnostic();
                diag.message = format!("platform {}: {}", platform, diag.message);
                diag
            }

            EvalError::MissingFormatterEngine { engine, package } => Diagnostic::error(format!(
                "formatter engine `{}` is unavailable",
                engine
            ))
            .with_context(format!("package `{}` is not in the package set", package))
            .with_suggestion(format!(
                "Remove `{}` from [formatter] engines, or use a package repository that provides `{}`",
                engine, package
            )),

            EvalError::MissingPackage { name } => {
                Diagnostic::error(format!("package `{}` is not in the package set", name))
                    .with_suggestion("Check the spelling against the package catalog".to_string())
                    .with_suggestion(
                        "Run `berth update` if the package was added upstream".to_string(),
                    )
            }

            EvalError::UnsupportedPlatform { supported } => {
                let mut diag =
                    Diagnostic::error("package repository does not support this platform");
                if !supported.is_empty() {
                    diag = diag.with_context(format!("supported: {}", supported.join(", ")));
                }
                diag.with_suggestion("Remove the platform from [systems]".to_string())
            }

            EvalError::Catalog { message } => {
                Diagnostic::error(format!("invalid package catalog: {}", message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_error_message() {
        let platform = Platform::new("aarch64-darwin").unwrap();
        let err = EvalError::for_platform(
            &platform,
            EvalError::MissingPackage {
                name: "wayland".into(),
            },
        );

        assert_eq!(
            err.to_string(),
            "platform aarch64-darwin: package `wayland` is not in the package set"
        );
        assert!(matches!(err.root_cause(), EvalError::MissingPackage { .. }));

        // Wrapping twice keeps a single platform prefix
        let again = EvalError::for_platform(&platform, err.clone());
        assert_eq!(again, err);
    }

    #[test]
    fn test_missing_engine_diagnostic() {
        let err = EvalError::MissingFormatterEngine {
            engine: "statix".into(),
            package: "statix".into(),
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("formatter engine `statix` is unavailable"));
        assert!(output.contains("help: consider:"));
    }
}
