//! frond - wasm web application bundler
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Compiles a wasm crate with the external toolchain, extracts stylesheets,
//! generates an HTML shell, and publishes everything under content-hashed
//! filenames, ready for static deployment.

pub mod cmd;
pub mod ui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use frond_schema::BuildProfile;

#[derive(Debug, Parser)]
#[command(name = "frond")]
#[command(author, version, about = "frond - wasm web application bundler")]
pub struct Cli {
    /// Project directory containing frond.toml
    #[arg(long, global = true, default_value = ".")]
    pub dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build the deployable bundle
    Build {
        /// Build profile: "static" (deployed under /static/) or "root"
        #[arg(long, env = "FROND_PROFILE")]
        profile: Option<BuildProfile>,
    },
    /// Serve the built output directory for local preview
    Serve {
        /// Build profile, decides the mount path
        #[arg(long, env = "FROND_PROFILE")]
        profile: Option<BuildProfile>,
        /// Port to bind on localhost
        #[arg(long, short, default_value_t = 8080)]
        port: u16,
    },
    /// Remove the output directory
    Clean,
}
