//! Input resolution error types and diagnostics.

use thiserror::Error;

use crate::core::workspace::MANIFEST_NAME;
use crate::util::diagnostic::Diagnostic;

/// Error during input resolution.
///
/// The input set is shared by every platform, so any of these aborts evaluation.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("cannot resolve input `{input}` from `{locator}`: {reason}")]
    UnresolvableSource {
        input: String,
        locator: String,
        reason: String,
    },

    #[error("input `{input}` has an invalid locator `{locator}`: {reason}")]
    InvalidLocator {
        input: String,
        locator: String,
        reason: String,
    },

    #[error("input `{input}` follows `{path}`, which does not exist")]
    FollowsTargetNotFound { input: String, path: String },

    #[error("follows cycle detected: {}", chain.join(" -> "))]
    FollowsCycle { chain: Vec<String> },

    #[error("no input named `{name}`")]
    UnknownInput { name: String, available: Vec<String> },
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::UnresolvableSource {
                input,
                locator,
                reason,
            } => Diagnostic::error(format!("cannot resolve input `{}`", input))
                .with_context(format!("locator: {}", locator))
                .with_context(reason.clone())
                .with_suggestion("Check your network connection".to_string())
                .with_suggestion("Verify the input url in Berth.toml".to_string())
                .with_suggestion(
                    "Run `berth update` if the locked revision no longer exists".to_string(),
                ),

            ResolveError::InvalidLocator {
                input,
                locator,
                reason,
            } => Diagnostic::error(format!("input `{}` has an invalid locator", input))
                .with_location(MANIFEST_NAME)
                .with_context(format!("locator: {}", locator))
                .with_context(reason.clone())
                .with_suggestion(
                    "Supported forms: path:, git+<url>, github:<owner>/<repo>, tarball+<url>"
                        .to_string(),
                )
                .with_suggestion("Run `berth update` to rewrite a damaged Berth.lock".to_string()),

            ResolveError::FollowsTargetNotFound { input, path } => {
                Diagnostic::error(format!("input `{}` follows a missing input", input))
                    .with_location(MANIFEST_NAME)
                    .with_context(format!("follows path: {}", path))
                    .with_suggestion(
                        "Follows paths are `/`-separated input names starting from the manifest that declares them"
                            .to_string(),
                    )
            }

            ResolveError::FollowsCycle { chain } => {
                Diagnostic::error("follows cycle detected in input graph")
                    .with_context(format!("cycle: {}", chain.join(" -> ")))
                    .with_suggestion("Point one of the follows at a fetched input".to_string())
            }

            ResolveError::UnknownInput { name, available } => {
                let mut diag = Diagnostic::error(format!("no input named `{}`", name));
                if !available.is_empty() {
                    diag = diag.with_context(format!("declared inputs: {}", available.join(", ")));
                }
                diag
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolvable_source_diagnostic() {
        let err = ResolveError::UnresolvableSource {
            input: "nixpkgs".to_string(),
            locator: "github:NixOS/nixpkgs".to_string(),
            reason: "offline and no cached snapshot".to_string(),
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("cannot resolve input `nixpkgs`"));
        assert!(output.contains("offline and no cached snapshot"));
        assert!(output.contains("1. Check your network connection"));
    }

    #[test]
    fn test_follows_cycle_message() {
        let err = ResolveError::FollowsCycle {
            chain: vec!["a/b".into(), "c".into(), "a/b".into()],
        };
        assert_eq!(err.to_string(), "follows cycle detected: a/b -> c -> a/b");
    }

    #[test]
    fn test_follows_target_points_at_manifest() {
        let err = ResolveError::FollowsTargetNotFound {
            input: "treefmt".to_string(),
            path: "nixpkgs-stable".to_string(),
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("  --> Berth.toml"));
        assert!(output.contains("follows path: nixpkgs-stable"));
    }
}
