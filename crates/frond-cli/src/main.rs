//! frond - wasm web application bundler CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use frond_cli::cmd;
use frond_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { profile } => cmd::build::build(&cli.dir, profile),
        Commands::Serve { profile, port } => cmd::serve::serve(&cli.dir, profile, port).await,
        Commands::Clean => cmd::clean::clean(&cli.dir),
    }
}
