//! External wasm compiler invocation and artifact staging.
//!
//! The wasm crate is compiled by an external toolchain (`wasm-pack`) into a
//! `.wasm` binary plus JS glue. Both are staged under content-hashed names,
//! and the glue's reference to the binary is rewritten to the hashed name so
//! the bootstrap loader's dynamic import resolves within the same build.

use std::path::{Path, PathBuf};
use std::process::Command;

use frond_schema::{ContentHash, OutputDescriptor, WasmTarget};
use tracing::debug;

use crate::assets::{AssetKind, AssetRegistry};
use crate::error::PipelineError;

/// Program name resolved on PATH when no explicit compiler is given.
pub const DEFAULT_COMPILER: &str = "wasm-pack";

/// How many stderr lines to surface when the compiler fails.
const STDERR_TAIL_LINES: usize = 20;

/// One invocation of the external wasm toolchain.
#[derive(Debug)]
pub struct WasmCompiler {
    program: PathBuf,
    crate_dir: PathBuf,
    target: WasmTarget,
}

impl WasmCompiler {
    /// Resolve the default compiler on PATH.
    ///
    /// # Errors
    ///
    /// [`PipelineError::CompilerNotFound`] if `wasm-pack` is not installed.
    pub fn resolve(crate_dir: &Path, target: WasmTarget) -> Result<Self, PipelineError> {
        let program = which::which(DEFAULT_COMPILER)
            .map_err(|_| PipelineError::CompilerNotFound(DEFAULT_COMPILER.to_string()))?;
        Ok(Self::with_program(program, crate_dir, target))
    }

    /// Use an explicit compiler binary (tests, or a pinned toolchain).
    pub fn with_program(program: PathBuf, crate_dir: &Path, target: WasmTarget) -> Self {
        Self {
            program,
            crate_dir: crate_dir.to_path_buf(),
            target,
        }
    }

    /// Compile the crate and stage the artifact into `staging`.
    ///
    /// Development mode only: the compiler is always invoked with `--dev`.
    /// The target flag is passed only when the profile's [`WasmTarget`]
    /// defines one -- this changes the artifact's loading convention and must
    /// stay consistent with the bootstrap loader.
    ///
    /// # Errors
    ///
    /// [`PipelineError::CompilerFailed`] with the stderr tail on a non-zero
    /// exit, [`PipelineError::MissingArtifact`] if no `.wasm` file was
    /// produced, or a tagged I/O error.
    pub fn compile(
        &self,
        staging: &Path,
        filename_template: &str,
        registry: &mut AssetRegistry,
    ) -> Result<(), PipelineError> {
        let out_dir = tempfile::tempdir().map_err(|e| PipelineError::io("wasm-compile", e))?;

        let mut cmd = Command::new(&self.program);
        cmd.arg("build")
            .arg(&self.crate_dir)
            .arg("--dev")
            .arg("--out-dir")
            .arg(out_dir.path());
        if let Some(flag) = self.target.flag() {
            cmd.arg("--target").arg(flag);
        }

        debug!(compiler = %self.program.display(), crate_dir = %self.crate_dir.display(), "invoking wasm compiler");
        let output = cmd
            .output()
            .map_err(|e| PipelineError::io("wasm-compile", e))?;
        if !output.status.success() {
            return Err(PipelineError::CompilerFailed {
                compiler: self.program.display().to_string(),
                status: output
                    .status
                    .code()
                    .map_or_else(|| "signal".to_string(), |c| format!("exit code {c}")),
                stderr_tail: stderr_tail(&output.stderr, STDERR_TAIL_LINES),
            });
        }

        self.stage(out_dir.path(), staging, filename_template, registry)
    }

    /// Hash, rename, and copy the produced artifact files into `staging`.
    ///
    /// `.wasm` files are staged first so glue `.js` files can be rewritten
    /// to reference the hashed names; the glue hash is computed over its
    /// final (rewritten) contents.
    fn stage(
        &self,
        out_dir: &Path,
        staging: &Path,
        filename_template: &str,
        registry: &mut AssetRegistry,
    ) -> Result<(), PipelineError> {
        let io = |e| PipelineError::io("wasm-compile", e);

        let mut wasm_files = Vec::new();
        let mut glue_files = Vec::new();
        for entry in walkdir::WalkDir::new(out_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            let path = entry.path();
            match path.extension().and_then(std::ffi::OsStr::to_str) {
                Some("wasm") => wasm_files.push(path.to_path_buf()),
                Some("js") => glue_files.push(path.to_path_buf()),
                _ => {} // type declarations, package.json -- not deployed
            }
        }
        if wasm_files.is_empty() {
            return Err(PipelineError::MissingArtifact(self.crate_dir.clone()));
        }

        // Binary first: collect original -> hashed name mapping.
        let mut renames = Vec::new();
        for path in &wasm_files {
            let stem = file_stem(path);
            let data = std::fs::read(path).map_err(io)?;
            let hash = ContentHash::compute(&data);
            let hashed = OutputDescriptor::expand(filename_template, &stem, &hash)
                .replace(".js", ".wasm");
            std::fs::write(staging.join(&hashed), &data).map_err(io)?;
            renames.push((format!("{stem}.wasm"), hashed.clone()));
            registry.record(stem, hashed, AssetKind::WasmArtifact);
        }

        // Glue second: rewrite binary references, then hash final contents.
        for path in &glue_files {
            let stem = file_stem(path);
            let mut text = std::fs::read_to_string(path).map_err(io)?;
            for (original, hashed) in &renames {
                text = text.replace(original, hashed);
            }
            let hash = ContentHash::compute(text.as_bytes());
            let hashed = OutputDescriptor::expand(filename_template, &stem, &hash);
            std::fs::write(staging.join(&hashed), &text).map_err(io)?;
            registry.record(stem, hashed, AssetKind::WasmArtifact);
        }

        Ok(())
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("module")
        .to_string()
}

/// Last `n` lines of a captured stderr buffer.
fn stderr_tail(stderr: &[u8], n: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    const TEMPLATE: &str = "[name].[contenthash].js";

    /// A stand-in compiler script that emits a fixed artifact pair into the
    /// directory following `--out-dir`.
    fn fake_compiler(dir: &Path, wasm_bytes: &str) -> PathBuf {
        let script = dir.join("fake-wasm-pack");
        let body = format!(
            "#!/bin/sh\n\
             out=\"\"\n\
             prev=\"\"\n\
             for arg in \"$@\"; do\n\
             \x20 if [ \"$prev\" = \"--out-dir\" ]; then out=\"$arg\"; fi\n\
             \x20 prev=\"$arg\"\n\
             done\n\
             mkdir -p \"$out\"\n\
             printf '{wasm_bytes}' > \"$out/home_bg.wasm\"\n\
             printf 'import wasm from \"./home_bg.wasm\";' > \"$out/home.js\"\n"
        );
        std::fs::write(&script, body).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    fn failing_compiler(dir: &Path) -> PathBuf {
        let script = dir.join("broken-wasm-pack");
        std::fs::write(&script, "#!/bin/sh\necho 'error[E0308]: mismatched types' >&2\nexit 1\n")
            .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[test]
    fn stages_hashed_artifact_and_rewrites_glue() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let compiler = WasmCompiler::with_program(
            fake_compiler(tmp.path(), "\\000asm"),
            tmp.path(),
            WasmTarget::Web,
        );

        let mut registry = AssetRegistry::new();
        compiler
            .compile(staging.path(), TEMPLATE, &mut registry)
            .unwrap();

        let artifacts: Vec<_> = registry.of_kind(AssetKind::WasmArtifact).collect();
        assert_eq!(artifacts.len(), 2);
        let wasm_name = &artifacts[0].filename;
        let glue_name = &artifacts[1].filename;
        assert!(wasm_name.ends_with(".wasm"));
        assert!(glue_name.ends_with(".js"));

        // Glue references the hashed binary name, not the original.
        let glue = std::fs::read_to_string(staging.path().join(glue_name)).unwrap();
        assert!(glue.contains(wasm_name.as_str()));
        assert!(!glue.contains("\"./home_bg.wasm\""));
    }

    #[test]
    fn artifact_hash_tracks_content() {
        let tmp = tempfile::tempdir().unwrap();

        let run = |wasm_bytes: &str| {
            let staging = tempfile::tempdir().unwrap();
            let compiler = WasmCompiler::with_program(
                fake_compiler(tmp.path(), wasm_bytes),
                tmp.path(),
                WasmTarget::Web,
            );
            let mut registry = AssetRegistry::new();
            compiler
                .compile(staging.path(), TEMPLATE, &mut registry)
                .unwrap();
            registry.of_kind(AssetKind::WasmArtifact).next().unwrap().filename.clone()
        };

        let a = run("\\000asm v1");
        let b = run("\\000asm v1");
        let c = run("\\000asm v2");
        assert_eq!(a, b); // unchanged content, same filename
        assert_ne!(a, c); // changed content, new filename
    }

    #[test]
    fn compiler_failure_carries_stderr_tail() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let compiler = WasmCompiler::with_program(
            failing_compiler(tmp.path()),
            tmp.path(),
            WasmTarget::Bundler,
        );

        let mut registry = AssetRegistry::new();
        let err = compiler
            .compile(staging.path(), TEMPLATE, &mut registry)
            .unwrap_err();
        assert_eq!(err.step(), "wasm-compile");
        match err {
            PipelineError::CompilerFailed { stderr_tail, .. } => {
                assert!(stderr_tail.contains("mismatched types"));
            }
            other => panic!("expected CompilerFailed, got {other:?}"),
        }
    }

    #[test]
    fn missing_compiler_is_reported() {
        let err = WasmCompiler::resolve(Path::new("."), WasmTarget::Web)
            .err()
            .filter(|e| matches!(e, PipelineError::CompilerNotFound(_)));
        // Only meaningful on machines without wasm-pack; on machines with it
        // installed, resolution succeeding is equally correct.
        if let Some(err) = err {
            assert_eq!(err.step(), "wasm-compile");
        }
    }
}
