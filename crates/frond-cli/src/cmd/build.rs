//! Build command

use std::path::Path;

use anyhow::{Context, Result};

use frond_core::Pipeline;
use frond_schema::{BuildProfile, FrondConfig};

use crate::ui::Output;

/// Run the full pipeline for the project in `dir`.
///
/// Exit status maps directly from the result: any failing step aborts with a
/// non-zero exit and a diagnostic naming that step.
pub fn build(dir: &Path, profile_flag: Option<BuildProfile>) -> Result<()> {
    let output = Output::new();

    let config_path = dir.join("frond.toml");
    let config = FrondConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let profile = config.resolve_profile(profile_flag)?;

    output.info(&format!("building with profile \"{profile}\""));
    let report = Pipeline::new(config, profile, dir)
        .run()
        .context("build failed")?;

    for asset in &report.assets {
        output.info(&format!("  emitted {}", asset.filename));
    }
    output.info(&format!("  emitted {}", report.shell));
    output.success(&format!(
        "published {} files to {}",
        report.assets.len() + 1,
        report.output_dir.display()
    ));
    Ok(())
}
