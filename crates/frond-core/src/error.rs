//! Domain-specific errors for pipeline execution.

use std::path::PathBuf;
use thiserror::Error;

/// A build-step failure. Every variant names the step it came from so the
/// CLI diagnostic always points at the originating step.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// An entry source module does not exist on disk.
    #[error("[entry] source module not found: {0}")]
    MissingEntry(PathBuf),

    /// The HTML template does not exist.
    #[error("[html-shell] template not found: {0}")]
    MissingTemplate(PathBuf),

    /// The template exists but lacks the injection points.
    #[error("[html-shell] template {path} has no {marker} insertion point")]
    BadTemplate {
        /// Template path.
        path: PathBuf,
        /// The missing closing tag (`</head>` or `</body>`).
        marker: &'static str,
    },

    /// The external wasm compiler is not on PATH.
    #[error("[wasm-compile] compiler \"{0}\" not found on PATH")]
    CompilerNotFound(String),

    /// The external wasm compiler exited non-zero.
    #[error("[wasm-compile] {compiler} failed with {status}\n{stderr_tail}")]
    CompilerFailed {
        /// Compiler program name.
        compiler: String,
        /// Exit status description.
        status: String,
        /// Last lines of the compiler's stderr.
        stderr_tail: String,
    },

    /// The compiler succeeded but produced no artifact directory.
    #[error("[wasm-compile] no artifact produced under {0}")]
    MissingArtifact(PathBuf),

    /// A source file matched a rule whose loader chain cannot process it.
    #[error("[{step}] loader chain failed on {path}: {reason}")]
    LoaderChain {
        /// Step name.
        step: &'static str,
        /// Source file being transformed.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// Filesystem failure, tagged with the step it happened in.
    #[error("[{step}] {source}")]
    Io {
        /// Step name.
        step: &'static str,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Tag an I/O error with the step it occurred in.
    pub fn io(step: &'static str, source: std::io::Error) -> Self {
        Self::Io { step, source }
    }

    /// The step this error originated from.
    pub fn step(&self) -> &'static str {
        match self {
            Self::MissingEntry(_) => "entry",
            Self::MissingTemplate(_) | Self::BadTemplate { .. } => "html-shell",
            Self::CompilerNotFound(_)
            | Self::CompilerFailed { .. }
            | Self::MissingArtifact(_) => "wasm-compile",
            Self::LoaderChain { step, .. } | Self::Io { step, .. } => step,
        }
    }
}
