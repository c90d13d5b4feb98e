//! Clean command

use std::path::Path;

use anyhow::{Context, Result};

use frond_schema::FrondConfig;

use crate::ui::Output;

/// Remove the configured output directory.
pub fn clean(dir: &Path) -> Result<()> {
    let output = Output::new();

    let config = FrondConfig::load(&dir.join("frond.toml")).context("loading frond.toml")?;
    let output_dir = dir.join(&config.output.dir);

    if output_dir.exists() {
        std::fs::remove_dir_all(&output_dir)
            .with_context(|| format!("removing {}", output_dir.display()))?;
        output.success(&format!("removed {}", output_dir.display()));
    } else {
        output.info("nothing to clean");
    }
    Ok(())
}
