//! HTML shell generation.
//!
//! Takes the user's template (opaque content, must only carry the standard
//! `</head>` and `</body>` insertion points) and injects references to every
//! asset the current build emitted: `<link>` tags for stylesheets into the
//! head, `<script>` tags for script bundles at the end of the body, so
//! stylesheets always precede scripts.

use std::path::Path;

use frond_schema::{BuildProfile, OutputDescriptor};

use crate::assets::{AssetKind, AssetRegistry};
use crate::error::PipelineError;

/// Render the HTML shell from a template file and the build's asset
/// registry.
///
/// # Errors
///
/// [`PipelineError::MissingTemplate`] if the template does not exist,
/// [`PipelineError::BadTemplate`] if it lacks an insertion point.
pub fn render_shell(
    template: &Path,
    registry: &AssetRegistry,
    profile: BuildProfile,
) -> Result<String, PipelineError> {
    if !template.is_file() {
        return Err(PipelineError::MissingTemplate(template.to_path_buf()));
    }
    let text = std::fs::read_to_string(template)
        .map_err(|source| PipelineError::io("html-shell", source))?;
    inject(&text, template, registry, profile)
}

fn inject(
    text: &str,
    template: &Path,
    registry: &AssetRegistry,
    profile: BuildProfile,
) -> Result<String, PipelineError> {
    let links: String = registry
        .of_kind(AssetKind::Stylesheet)
        .map(|asset| {
            let href = OutputDescriptor::public_url(profile, &asset.filename);
            format!("    <link rel=\"stylesheet\" href=\"{href}\">\n")
        })
        .collect();

    let scripts: String = registry
        .of_kind(AssetKind::Script)
        .map(|asset| {
            let src = OutputDescriptor::public_url(profile, &asset.filename);
            format!("    <script defer src=\"{src}\"></script>\n")
        })
        .collect();

    let head_pos = text
        .find("</head>")
        .ok_or_else(|| PipelineError::BadTemplate {
            path: template.to_path_buf(),
            marker: "</head>",
        })?;
    let mut shell = String::with_capacity(text.len() + links.len() + scripts.len());
    shell.push_str(&text[..head_pos]);
    shell.push_str(&links);
    shell.push_str(&text[head_pos..]);

    let body_pos = shell
        .find("</body>")
        .ok_or_else(|| PipelineError::BadTemplate {
            path: template.to_path_buf(),
            marker: "</body>",
        })?;
    let mut out = String::with_capacity(shell.len() + scripts.len());
    out.push_str(&shell[..body_pos]);
    out.push_str(&scripts);
    out.push_str(&shell[body_pos..]);
    Ok(out)
}
