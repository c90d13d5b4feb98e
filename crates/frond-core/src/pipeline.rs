//! The pipeline runner.
//!
//! Executes the declared plugin steps in order against a staging directory,
//! then publishes the staging directory to the configured output directory
//! in one move. A failing step aborts the whole build; nothing is published.

use std::path::{Path, PathBuf};

use frond_schema::{
    BuildProfile, ContentHash, FrondConfig, LoaderKind, OutputDescriptor, PluginStep,
};
use tracing::info;

use crate::assets::{AssetKind, AssetRegistry, EmittedAsset};
use crate::css::CssPipeline;
use crate::error::PipelineError;
use crate::html::render_shell;
use crate::wasm::WasmCompiler;

/// Name of the generated HTML shell inside the output directory. The shell
/// is the stable entry URL, so it is the one file that is never hashed.
const SHELL_FILENAME: &str = "index.html";

/// Directories never scanned for rule-matched sources.
const SKIP_DIRS: &[&str] = &["target", "pkg", "node_modules"];

/// Summary of one successful build.
#[derive(Debug)]
pub struct BuildReport {
    /// Directory every emitted file was published to.
    pub output_dir: PathBuf,
    /// Filename of the generated shell.
    pub shell: String,
    /// Every emitted asset, in emission order.
    pub assets: Vec<EmittedAsset>,
}

/// One build invocation over a validated configuration.
#[derive(Debug)]
pub struct Pipeline {
    config: FrondConfig,
    profile: BuildProfile,
    project_dir: PathBuf,
    compiler_program: Option<PathBuf>,
}

impl Pipeline {
    /// Create a pipeline for a project directory.
    pub fn new(config: FrondConfig, profile: BuildProfile, project_dir: &Path) -> Self {
        Self {
            config,
            profile,
            project_dir: project_dir.to_path_buf(),
            compiler_program: None,
        }
    }

    /// Override the external wasm compiler binary (tests, pinned toolchains).
    pub fn with_compiler(mut self, program: PathBuf) -> Self {
        self.compiler_program = Some(program);
        self
    }

    /// Run every step and publish the result.
    ///
    /// # Errors
    ///
    /// The first failing step aborts the build with a [`PipelineError`]
    /// naming that step. No partial output is published.
    pub fn run(&self) -> Result<BuildReport, PipelineError> {
        let (entry_name, entry_sources) = self.config.entry();
        let entry_paths = self.check_entries(entry_sources)?;

        let staging = tempfile::tempdir().map_err(|e| PipelineError::io("emit", e))?;
        let mut registry = AssetRegistry::new();

        for step in &self.config.plugins {
            match step {
                PluginStep::WasmCompile { crate_dir } => {
                    self.run_wasm(crate_dir, staging.path(), &mut registry)?;
                }
                PluginStep::CssExtract { filename } => {
                    self.run_css_extract(entry_name, filename, staging.path(), &mut registry)?;
                }
                PluginStep::HtmlShell { template } => {
                    // The shell must see every emitted asset, including the
                    // entry bundle, so the bundle is emitted just before it.
                    self.emit_bundle(entry_name, &entry_paths, staging.path(), &mut registry)?;
                    self.run_shell(template, staging.path(), &registry)?;
                }
            }
            info!(step = step.name(), "step complete");
        }

        let output_dir = self.project_dir.join(&self.config.output.dir);
        publish(staging, &output_dir)?;
        info!(output = %output_dir.display(), "build published");

        Ok(BuildReport {
            output_dir,
            shell: SHELL_FILENAME.to_string(),
            assets: registry.all().to_vec(),
        })
    }

    /// Resolve entry sources against the project directory and require each
    /// one to exist.
    fn check_entries(&self, sources: &[PathBuf]) -> Result<Vec<PathBuf>, PipelineError> {
        let mut resolved = Vec::with_capacity(sources.len());
        for source in sources {
            let path = self.project_dir.join(source);
            if !path.is_file() {
                return Err(PipelineError::MissingEntry(path));
            }
            resolved.push(path);
        }
        Ok(resolved)
    }

    fn run_wasm(
        &self,
        crate_dir: &Path,
        staging: &Path,
        registry: &mut AssetRegistry,
    ) -> Result<(), PipelineError> {
        let crate_dir = self.project_dir.join(crate_dir);
        let target = self.profile.wasm_target();
        let compiler = match &self.compiler_program {
            Some(program) => WasmCompiler::with_program(program.clone(), &crate_dir, target),
            None => WasmCompiler::resolve(&crate_dir, target)?,
        };
        compiler.compile(staging, &self.config.output.filename, registry)
    }

    fn run_css_extract(
        &self,
        entry_name: &str,
        filename_template: &str,
        staging: &Path,
        registry: &mut AssetRegistry,
    ) -> Result<(), PipelineError> {
        let io = |e| PipelineError::io("css-extract", e);

        let mut css = CssPipeline::new(self.profile);
        for path in self.discover_rule_sources() {
            let Some(rule) = self.config.rules.iter().find(|r| r.matches(&path)) else {
                continue;
            };
            if !rule.loaders.contains(&LoaderKind::CssExtract) {
                continue;
            }
            let source = std::fs::read_to_string(&path).map_err(io)?;
            css.process(rule, &path, &source)?;
        }

        if let Some(sheet) = css.finish() {
            let hash = ContentHash::compute(sheet.as_bytes());
            let filename = OutputDescriptor::expand(filename_template, entry_name, &hash);
            std::fs::write(staging.join(&filename), sheet).map_err(io)?;
            registry.record(entry_name, filename, AssetKind::Stylesheet);
        }
        Ok(())
    }

    /// Source files eligible for module rules, in a deterministic order.
    ///
    /// Scans the project directory, skipping the output directory, build
    /// byproducts, and hidden entries.
    fn discover_rule_sources(&self) -> Vec<PathBuf> {
        let output_dir = self.project_dir.join(&self.config.output.dir);
        walkdir::WalkDir::new(&self.project_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                if name.starts_with('.') && entry.depth() > 0 {
                    return false;
                }
                if entry.file_type().is_dir() {
                    return entry.path() != output_dir && !SKIP_DIRS.contains(&name.as_ref());
                }
                true
            })
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.path().to_path_buf())
            .collect()
    }

    /// Concatenate the entry sources into the script bundle.
    ///
    /// Dynamic imports in the bundle are rewritten so every specifier
    /// resolves to a file emitted by this same build: the wasm package
    /// import (`'./pkg'`) to the hashed glue filename, and imports of
    /// rule-matched stylesheet sources to the hashed standalone stylesheet.
    /// The hash is computed over the final (rewritten) bundle contents.
    fn emit_bundle(
        &self,
        entry_name: &str,
        entry_paths: &[PathBuf],
        staging: &Path,
        registry: &mut AssetRegistry,
    ) -> Result<(), PipelineError> {
        let io = |e| PipelineError::io("emit", e);

        let mut parts = Vec::with_capacity(entry_paths.len());
        for path in entry_paths {
            parts.push(std::fs::read_to_string(path).map_err(io)?);
        }
        let mut bundle = parts.join("\n");

        let glue = registry
            .of_kind(AssetKind::WasmArtifact)
            .find(|asset| asset.filename.ends_with(".js"))
            .map(|asset| OutputDescriptor::public_url(self.profile, &asset.filename));
        if let Some(glue_url) = glue {
            bundle = replace_specifier(&bundle, "./pkg", &glue_url);
        }
        bundle = self.rewrite_stylesheet_imports(bundle, registry);

        let hash = ContentHash::compute(bundle.as_bytes());
        let filename = OutputDescriptor::expand(&self.config.output.filename, entry_name, &hash);
        std::fs::write(staging.join(&filename), bundle).map_err(io)?;
        registry.record(entry_name, filename, AssetKind::Script);
        Ok(())
    }

    /// Point imports of rule-matched stylesheet sources at the emitted
    /// stylesheet.
    ///
    /// The sources themselves are not published; they were folded into the
    /// standalone stylesheet by the css-extract step. Without the rewrite
    /// those specifiers would name files absent from the output directory.
    fn rewrite_stylesheet_imports(&self, mut bundle: String, registry: &AssetRegistry) -> String {
        let Some(sheet_url) = registry
            .of_kind(AssetKind::Stylesheet)
            .next()
            .map(|asset| OutputDescriptor::public_url(self.profile, &asset.filename))
        else {
            return bundle;
        };
        for path in self.discover_rule_sources() {
            let extracted = self
                .config
                .rules
                .iter()
                .any(|r| r.matches(&path) && r.loaders.contains(&LoaderKind::CssExtract));
            if !extracted {
                continue;
            }
            let Ok(rel) = path.strip_prefix(&self.project_dir) else {
                continue;
            };
            bundle = replace_specifier(&bundle, &format!("./{}", rel.display()), &sheet_url);
        }
        bundle
    }

    fn run_shell(
        &self,
        template: &Path,
        staging: &Path,
        registry: &AssetRegistry,
    ) -> Result<(), PipelineError> {
        let shell = render_shell(&self.project_dir.join(template), registry, self.profile)?;
        std::fs::write(staging.join(SHELL_FILENAME), shell)
            .map_err(|e| PipelineError::io("html-shell", e))
    }
}

/// Swap a quoted module specifier for another, preserving the quote style.
fn replace_specifier(bundle: &str, from: &str, to: &str) -> String {
    bundle
        .replace(&format!("'{from}'"), &format!("'{to}'"))
        .replace(&format!("\"{from}\""), &format!("\"{to}\""))
}

/// Replace the output directory with the staged build.
///
/// The staged tree is first materialized next to the output directory, so
/// the previous output is removed only once its replacement fully exists.
/// Rename is preferred (atomic on the same filesystem); a recursive copy is
/// the cross-filesystem fallback, and a copy failure cleans up both the
/// staged tree and the partial copy.
fn publish(staging: tempfile::TempDir, output_dir: &Path) -> Result<(), PipelineError> {
    let io = |e| PipelineError::io("emit", e);

    if let Some(parent) = output_dir.parent() {
        std::fs::create_dir_all(parent).map_err(io)?;
    }
    let incoming = incoming_path(output_dir);
    if incoming.exists() {
        std::fs::remove_dir_all(&incoming).map_err(io)?;
    }

    let staged = staging.keep();
    if std::fs::rename(&staged, &incoming).is_err() {
        let copied = std::fs::create_dir_all(&incoming).map_err(io).and_then(|()| {
            fs_extra::dir::copy(
                &staged,
                &incoming,
                &fs_extra::dir::CopyOptions::new()
                    .content_only(true)
                    .overwrite(true),
            )
            .map_err(|e| PipelineError::io("emit", std::io::Error::other(e)))
        });
        let _ = std::fs::remove_dir_all(&staged);
        if let Err(e) = copied {
            let _ = std::fs::remove_dir_all(&incoming);
            return Err(e);
        }
    }

    if output_dir.exists() {
        std::fs::remove_dir_all(output_dir).map_err(io)?;
    }
    std::fs::rename(&incoming, output_dir).map_err(io)
}

/// Sibling path the staged build lands on before the final swap.
fn incoming_path(output_dir: &Path) -> PathBuf {
    let name = output_dir
        .file_name()
        .map_or_else(|| "out".to_string(), |n| n.to_string_lossy().into_owned());
    output_dir.with_file_name(format!(".{name}.incoming"))
}
