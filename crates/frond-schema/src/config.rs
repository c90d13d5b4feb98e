//! Declarative build configuration (`frond.toml`).
//!
//! The configuration mirrors the shape of the build it describes: one entry
//! descriptor, one output descriptor, an ordered plugin list, and a module
//! rule set. Order in the plugin list is execution order -- explicit and
//! inspectable, never inferred from registration side effects.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Placeholder expanded to the logical bundle name.
pub const NAME_TOKEN: &str = "[name]";

/// Placeholder expanded to the truncated content hash.
///
/// Every output filename template must carry this token; without it two
/// builds with different content would collide on the same filename and
/// browser caches would never invalidate.
pub const CONTENT_HASH_TOKEN: &str = "[contenthash]";

/// Environment variable consulted when no `--profile` flag is given.
pub const PROFILE_ENV: &str = "FROND_PROFILE";

/// Errors raised while loading or validating a [`FrondConfig`].
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config {path}: {source}")]
    Read {
        /// Path that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The entry table is empty.
    #[error("no entry defined; exactly one entry (e.g. \"home\") is required")]
    NoEntry,

    /// More than one entry was defined.
    #[error("expected exactly one entry, found {0}")]
    MultipleEntries(usize),

    /// An entry resolves to zero source modules.
    #[error("entry \"{0}\" has no source modules")]
    EmptyEntry(String),

    /// A filename template is missing the content hash token.
    #[error("filename template \"{0}\" is missing the {CONTENT_HASH_TOKEN} token")]
    MissingHashToken(String),

    /// The HTML shell step must run after all asset emission is known.
    #[error("html-shell must be the final plugin step so it sees every emitted asset")]
    ShellNotLast,

    /// No HTML shell step was declared at all.
    #[error("plugin list has no html-shell step")]
    NoShell,

    /// A module rule uses the extract loader but no css-extract plugin exists.
    #[error("a module rule uses the extract loader but no css-extract plugin is declared")]
    MissingExtractPlugin,

    /// The extract loader must be declared first so it applies last.
    #[error("extract loader must be declared first in the chain (loaders apply right-to-left)")]
    ExtractNotFirst,

    /// No build profile was selected anywhere.
    #[error(
        "no build profile selected; pass --profile, set {PROFILE_ENV}, or pin `profile` in frond.toml"
    )]
    NoProfile,

    /// An unknown profile name was given.
    #[error("unknown profile \"{0}\" (expected \"static\" or \"root\")")]
    UnknownProfile(String),
}

/// Where the deployed bundle will live, and therefore how the wasm compiler
/// is invoked and how asset URLs are prefixed.
///
/// The two profiles are deliberately an explicit choice: they disagree on the
/// public base path and on the wasm compiler's target flag, and silently
/// defaulting one way would produce a bundle whose loading convention does
/// not match its deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildProfile {
    /// Deployed under a fixed `/static/` subpath; the wasm artifact uses the
    /// bundler loading convention.
    Static,
    /// Deployed at the site root; the wasm compiler is passed the `web`
    /// target flag, producing an artifact with an explicit init entry point.
    Root,
}

impl BuildProfile {
    /// Public base path prefixed to every emitted asset URL, if any.
    pub fn public_path(self) -> Option<&'static str> {
        match self {
            Self::Static => Some("/static/"),
            Self::Root => None,
        }
    }

    /// Target flag handed to the external wasm compiler.
    pub fn wasm_target(self) -> WasmTarget {
        match self {
            Self::Static => WasmTarget::Bundler,
            Self::Root => WasmTarget::Web,
        }
    }
}

impl std::str::FromStr for BuildProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "root" => Ok(Self::Root),
            other => Err(ConfigError::UnknownProfile(other.to_string())),
        }
    }
}

impl std::fmt::Display for BuildProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Root => write!(f, "root"),
        }
    }
}

/// Target convention for the external wasm compiler.
///
/// `Web` artifacts export an explicit init function the bootstrap loader must
/// await before calling `start`; `Bundler` artifacts expect the bundler's own
/// instantiation glue. The bootstrap loader contract assumes explicit init,
/// so the profile choice must stay consistent with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WasmTarget {
    /// Explicit-init artifact (`--target web`).
    Web,
    /// Bundler-convention artifact (compiler default, no flag passed).
    Bundler,
}

impl WasmTarget {
    /// The flag value passed to the compiler, if any.
    pub fn flag(self) -> Option<&'static str> {
        match self {
            Self::Web => Some("web"),
            Self::Bundler => None,
        }
    }
}

/// Build mode. Only a development profile exists: unminified output, fast
/// rebuilds, verbose diagnostics.
///
/// There is deliberately no production-optimized mode -- the original
/// pipeline never defined one, and inventing minification settings here
/// would paper over that gap instead of surfacing it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Unminified, fast, diagnostic-heavy.
    #[default]
    Development,
}

/// Target directory, filename template, and public base path for emitted
/// assets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDescriptor {
    /// Directory every emitted file lands under.
    pub dir: PathBuf,

    /// Filename template for script bundles. Must contain
    /// [`CONTENT_HASH_TOKEN`]; usually `[name].[contenthash].js`.
    pub filename: String,
}

impl OutputDescriptor {
    /// Expand a filename template with the bundle name and content hash.
    pub fn expand(template: &str, name: &str, hash: &crate::ContentHash) -> String {
        template
            .replace(NAME_TOKEN, name)
            .replace(CONTENT_HASH_TOKEN, hash.short())
    }

    /// Absolute URL for an emitted filename under the given profile.
    ///
    /// With a public base path the reference is prefixed (`/static/x.js`);
    /// without one it is root-relative (`/x.js`).
    pub fn public_url(profile: BuildProfile, filename: &str) -> String {
        match profile.public_path() {
            Some(base) => format!("{base}{filename}"),
            None => format!("/{filename}"),
        }
    }
}

/// One build step. Execution order is the declared sequence order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PluginStep {
    /// Compile the wasm crate with the external toolchain and stage its
    /// artifact for the bootstrap loader's dynamic import.
    WasmCompile {
        /// Directory of the wasm crate to hand to the compiler.
        crate_dir: PathBuf,
    },
    /// Pull stylesheet content out of the bundle into a standalone
    /// content-hashed file.
    CssExtract {
        /// Filename template for the extracted stylesheet. Must contain
        /// [`CONTENT_HASH_TOKEN`].
        filename: String,
    },
    /// Generate the HTML shell from a template, injecting references to
    /// every asset emitted by the same build. Must be the final step.
    HtmlShell {
        /// Path to the HTML template file.
        template: PathBuf,
    },
}

impl PluginStep {
    /// Stable step name used in diagnostics when a build aborts.
    pub fn name(&self) -> &'static str {
        match self {
            Self::WasmCompile { .. } => "wasm-compile",
            Self::CssExtract { .. } => "css-extract",
            Self::HtmlShell { .. } => "html-shell",
        }
    }
}

/// A per-file-type transform chain.
///
/// Loaders apply right-to-left (last declared runs first), matching the
/// bundler convention: `[Extract, Resolve]` resolves references on raw
/// source before extraction finalizes the standalone file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleRule {
    /// File extensions (without the dot) this rule matches.
    pub extensions: Vec<String>,
    /// Loader chain, declared in right-to-left application order.
    pub loaders: Vec<LoaderKind>,
}

impl ModuleRule {
    /// Whether this rule matches a source path by extension.
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(std::ffi::OsStr::to_str)
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}

/// A single loader step inside a [`ModuleRule`] chain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoaderKind {
    /// Rewrite intra-stylesheet `url()` / `@import` references against the
    /// public base path. Runs on raw source.
    CssResolve,
    /// Route the (already resolved) content into the standalone stylesheet
    /// file declared by the css-extract plugin. Runs last.
    CssExtract,
}

/// The full declarative build configuration, loaded from `frond.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrondConfig {
    /// Pinned profile, overridable by flag or environment.
    #[serde(default)]
    pub profile: Option<BuildProfile>,

    /// Build mode. Development is the only defined mode.
    #[serde(default)]
    pub mode: BuildMode,

    /// Logical bundle name -> ordered source module paths. Exactly one.
    pub entry: BTreeMap<String, Vec<PathBuf>>,

    /// Output directory and filename template.
    pub output: OutputDescriptor,

    /// Ordered build steps.
    pub plugins: Vec<PluginStep>,

    /// Per-file-type loader chains.
    #[serde(default = "default_rules")]
    pub rules: Vec<ModuleRule>,
}

/// The default module rule set: stylesheets through `[Extract, Resolve]`.
fn default_rules() -> Vec<ModuleRule> {
    vec![ModuleRule {
        extensions: vec!["css".to_string()],
        loaders: vec![LoaderKind::CssExtract, LoaderKind::CssResolve],
    }]
}

impl FrondConfig {
    /// Parse a configuration from TOML text and validate it.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the text is not valid TOML or violates a
    /// structural invariant (see [`FrondConfig::validate`]).
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate `frond.toml` from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, otherwise
    /// any error from [`FrondConfig::from_toml`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Check the structural invariants the pipeline relies on.
    ///
    /// # Errors
    ///
    /// - exactly one entry, with at least one source module;
    /// - every filename template carries [`CONTENT_HASH_TOKEN`];
    /// - `html-shell` is present and last;
    /// - any rule using the extract loader has a `css-extract` plugin, and
    ///   declares the extract loader first (so it applies last).
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.entry.len() {
            0 => return Err(ConfigError::NoEntry),
            1 => {}
            n => return Err(ConfigError::MultipleEntries(n)),
        }
        for (name, sources) in &self.entry {
            if sources.is_empty() {
                return Err(ConfigError::EmptyEntry(name.clone()));
            }
        }

        if !self.output.filename.contains(CONTENT_HASH_TOKEN) {
            return Err(ConfigError::MissingHashToken(self.output.filename.clone()));
        }

        let shell_pos = self
            .plugins
            .iter()
            .position(|p| matches!(p, PluginStep::HtmlShell { .. }))
            .ok_or(ConfigError::NoShell)?;
        if shell_pos != self.plugins.len() - 1 {
            return Err(ConfigError::ShellNotLast);
        }

        let has_extract_plugin = self
            .plugins
            .iter()
            .any(|p| matches!(p, PluginStep::CssExtract { .. }));
        for p in &self.plugins {
            if let PluginStep::CssExtract { filename } = p {
                if !filename.contains(CONTENT_HASH_TOKEN) {
                    return Err(ConfigError::MissingHashToken(filename.clone()));
                }
            }
        }

        for rule in &self.rules {
            let uses_extract = rule.loaders.contains(&LoaderKind::CssExtract);
            if uses_extract {
                if !has_extract_plugin {
                    return Err(ConfigError::MissingExtractPlugin);
                }
                if rule.loaders.first() != Some(&LoaderKind::CssExtract) {
                    return Err(ConfigError::ExtractNotFirst);
                }
            }
        }

        Ok(())
    }

    /// The single entry: logical bundle name and its ordered sources.
    ///
    /// Valid after [`FrondConfig::validate`]; falls back to an empty entry
    /// only for configs that bypassed validation.
    pub fn entry(&self) -> (&str, &[PathBuf]) {
        self.entry
            .iter()
            .next()
            .map_or(("", &[]), |(name, sources)| {
                (name.as_str(), sources.as_slice())
            })
    }

    /// Resolve the effective build profile.
    ///
    /// Precedence: explicit flag, then the [`PROFILE_ENV`] environment
    /// variable, then the `profile` key in `frond.toml`. A build with none
    /// of the three is an error -- the profile divergence is an explicit
    /// choice, never a silent default.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownProfile`] for an unparseable env value, or
    /// [`ConfigError::NoProfile`] when nothing selects a profile.
    pub fn resolve_profile(&self, flag: Option<BuildProfile>) -> Result<BuildProfile, ConfigError> {
        if let Some(profile) = flag {
            return Ok(profile);
        }
        if let Ok(value) = std::env::var(PROFILE_ENV) {
            return value.parse();
        }
        self.profile.ok_or(ConfigError::NoProfile)
    }
}
