//! frond pipeline execution.
//!
//! Turns a validated [`frond_schema::FrondConfig`] into a deployable static
//! bundle: compiles the wasm crate with the external toolchain, extracts
//! stylesheets, generates the HTML shell, and emits everything under
//! content-hashed filenames.
//!
//! A build is all-or-nothing: every step runs into a staging directory, and
//! only a fully successful build is published to the output directory. Any
//! failing step aborts the build with a diagnostic naming that step.

pub mod assets;
pub mod css;
pub mod error;
pub mod html;
pub mod pipeline;
pub mod wasm;

pub use assets::{AssetKind, AssetRegistry, EmittedAsset};
pub use error::PipelineError;
pub use pipeline::{BuildReport, Pipeline};
