//! Berth.toml manifest parsing and schema.
//!
//! The manifest declares a project's inputs, its target platforms, the formatter
//! roster and its development shells. Supports both `Berth.toml` (canonical) and
//! `berth.toml` (alias).
//!
//! Snapshots of inputs may carry their own `Berth.toml`; for those only the
//! `[inputs]` table matters, so every other section is optional here and
//! enforced by [`Manifest::evaluation_config`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::compose::engines::EngineKind;
use crate::core::locator::Locator;
use crate::core::platform::Platform;
use crate::util::diagnostic::TomlSyntaxError;

/// Name of the dev shell used when none is requested explicitly.
pub const DEFAULT_SHELL: &str = "default";

/// Project metadata from the [project] section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// A declared input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDecl {
    /// Where the input comes from
    pub locator: Locator,

    /// Locator string as written, for diagnostics
    pub url: String,

    /// Transitive inputs of this input that must reuse another node.
    /// Maps nested input name -> `/`-separated path from the declaring manifest.
    pub follows: BTreeMap<String, String>,
}

/// Where the platform list comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemsDecl {
    /// `systems.toml` at the root of the named input
    Input(String),
    /// Inline list
    List(Vec<Platform>),
}

/// Formatter roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FormatterDecl {
    /// Engines, in the order they run
    #[serde(default = "default_engines")]
    pub engines: Vec<EngineKind>,

    /// Glob patterns (relative to the project root) never handed to an engine
    #[serde(default)]
    pub excludes: Vec<String>,
}

fn default_engines() -> Vec<EngineKind> {
    EngineKind::default_roster().to_vec()
}

impl Default for FormatterDecl {
    fn default() -> Self {
        FormatterDecl {
            engines: default_engines(),
            excludes: Vec::new(),
        }
    }
}

/// A development shell declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DevShellDecl {
    /// Interactive tools
    #[serde(default)]
    pub packages: Vec<String>,

    /// Build-time tools (compilers, pkg-config, ...)
    #[serde(default)]
    pub native_build_inputs: Vec<String>,

    /// Runtime libraries; order is the library search order
    #[serde(default)]
    pub build_inputs: Vec<String>,

    /// Library placed first on the search path
    #[serde(default)]
    pub library_path_seed: Option<String>,
}

/// The sections evaluation needs, validated to be present.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationConfig<'a> {
    pub systems: &'a SystemsDecl,
    pub packages_input: &'a str,
    pub formatter: &'a FormatterDecl,
    pub dev_shells: &'a BTreeMap<String, DevShellDecl>,
}

/// A parsed Berth.toml.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub project: Option<ProjectMetadata>,
    pub inputs: BTreeMap<String, InputDecl>,
    pub systems: Option<SystemsDecl>,
    pub packages_input: Option<String>,
    pub formatter: FormatterDecl,
    pub dev_shells: BTreeMap<String, DevShellDecl>,

    /// Directory containing the manifest
    manifest_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawManifest {
    #[serde(default)]
    project: Option<ProjectMetadata>,

    #[serde(default)]
    inputs: BTreeMap<String, RawInput>,

    #[serde(default)]
    systems: Option<RawSystems>,

    #[serde(default)]
    packages: Option<RawPackages>,

    #[serde(default)]
    formatter: Option<FormatterDecl>,

    #[serde(default)]
    dev_shells: BTreeMap<String, DevShellDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawInput {
    Simple(String),
    Detailed {
        url: String,
        #[serde(default)]
        follows: BTreeMap<String, String>,
    },
}

#[derive(Debug, Deserialize)]
struct RawSystems {
    input: Option<String>,
    list: Option<Vec<Platform>>,
}

#[derive(Debug, Deserialize)]
struct RawPackages {
    input: String,
}

impl Manifest {
    /// Load a manifest from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;

        Self::parse(&content, path)
    }

    /// Parse manifest content.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let raw: RawManifest =
            toml::from_str(content).map_err(|e| TomlSyntaxError::from_toml(path, content, &e))?;

        let manifest_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();

        let mut inputs = BTreeMap::new();
        for (name, raw_input) in raw.inputs {
            validate_input_name(&name)?;
            let (url, follows) = match raw_input {
                RawInput::Simple(url) => (url, BTreeMap::new()),
                RawInput::Detailed { url, follows } => (url, follows),
            };
            for (nested, target) in &follows {
                validate_input_name(nested)?;
                if target.split('/').any(str::is_empty) {
                    bail!(
                        "input `{}`: follows path `{}` for `{}` has an empty segment",
                        name,
                        target,
                        nested
                    );
                }
            }
            let locator = Locator::parse(&url)
                .with_context(|| format!("input `{}` has an invalid url", name))?;
            inputs.insert(
                name,
                InputDecl {
                    locator,
                    url,
                    follows,
                },
            );
        }

        let systems = match raw.systems {
            None => None,
            Some(RawSystems {
                input: Some(input),
                list: None,
            }) => {
                if !inputs.contains_key(&input) {
                    bail!("[systems] refers to undeclared input `{}`", input);
                }
                Some(SystemsDecl::Input(input))
            }
            Some(RawSystems {
                input: None,
                list: Some(list),
            }) => Some(SystemsDecl::List(list)),
            Some(_) => bail!("[systems] must set exactly one of `input` or `list`"),
        };

        let packages_input = match raw.packages {
            Some(p) => {
                if !inputs.contains_key(&p.input) {
                    bail!("[packages] refers to undeclared input `{}`", p.input);
                }
                Some(p.input)
            }
            None => None,
        };

        let formatter = raw.formatter.unwrap_or_default();
        let mut seen = Vec::new();
        for engine in &formatter.engines {
            if seen.contains(engine) {
                bail!("formatter engine `{}` is listed more than once", engine);
            }
            seen.push(*engine);
        }
        for pattern in &formatter.excludes {
            if let Err(e) = glob::Pattern::new(pattern) {
                bail!("[formatter] exclude `{}` is not a valid glob: {}", pattern, e.msg);
            }
        }

        if !raw.dev_shells.is_empty() && !raw.dev_shells.contains_key(DEFAULT_SHELL) {
            bail!("[dev-shells] must declare a `{}` shell", DEFAULT_SHELL);
        }

        Ok(Manifest {
            project: raw.project,
            inputs,
            systems,
            packages_input,
            formatter,
            dev_shells: raw.dev_shells,
            manifest_dir,
        })
    }

    /// Project name, falling back to the manifest directory name.
    pub fn name(&self) -> &str {
        self.project
            .as_ref()
            .map(|p| p.name.as_str())
            .or_else(|| self.manifest_dir.file_name().and_then(|n| n.to_str()))
            .unwrap_or("berth")
    }

    /// Directory containing the manifest.
    pub fn manifest_dir(&self) -> &Path {
        &self.manifest_dir
    }

    /// Get a declared input by name.
    pub fn input(&self, name: &str) -> Option<&InputDecl> {
        self.inputs.get(name)
    }

    /// The sections required for evaluation.
    pub fn evaluation_config(&self) -> Result<EvaluationConfig<'_>> {
        let systems = self
            .systems
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("manifest has no [systems] section"))?;
        let packages_input = self
            .packages_input
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("manifest has no [packages] section"))?;

        Ok(EvaluationConfig {
            systems,
            packages_input,
            formatter: &self.formatter,
            dev_shells: &self.dev_shells,
        })
    }

    /// Resolution-affecting view of the inputs, used for lockfile freshness.
    pub fn inputs_fingerprint_json(&self) -> serde_json::Value {
        let inputs: serde_json::Map<String, serde_json::Value> = self
            .inputs
            .iter()
            .map(|(name, decl)| {
                (
                    name.clone(),
                    serde_json::json!({
                        "locator": decl.locator.to_url_string(),
                        "follows": decl.follows,
                    }),
                )
            })
            .collect();
        serde_json::Value::Object(inputs)
    }
}

fn validate_input_name(name: &str) -> Result<()> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        bail!(
            "invalid input name `{}`: use letters, digits, `-` and `_` only",
            name
        );
    }
    Ok(())
}

/// Generate a starter Berth.toml for a graphics-capable native project.
pub fn generate_default_manifest(name: &str) -> String {
    format!(
        r#"[project]
name = "{name}"

[inputs.nixpkgs]
url = "github:NixOS/nixpkgs/nixos-unstable"

[inputs.systems]
url = "github:nix-systems/default"

[inputs.treefmt]
url = "github:numtide/treefmt-nix"
follows = {{ nixpkgs = "nixpkgs" }}

[systems]
input = "systems"

[packages]
input = "nixpkgs"

[formatter]
engines = ["nixfmt", "rustfmt", "deadnix", "statix"]
excludes = ["target/**"]

[dev-shells.default]
packages = ["cargo", "rustc", "rust-analyzer", "clippy"]
native-build-inputs = ["pkg-config", "cmake"]
build-inputs = [
    "expat",
    "fontconfig",
    "freetype",
    "libxkbcommon",
    "wayland",
    "xorg.libX11",
    "xorg.libXcursor",
    "xorg.libXi",
    "xorg.libXrandr",
]
library-path-seed = "vulkan-loader"
"#
    )
}
