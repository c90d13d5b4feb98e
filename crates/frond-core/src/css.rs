//! Stylesheet loader chain.
//!
//! Matched stylesheet sources run through their rule's loader chain
//! right-to-left (last declared runs first): `css-resolve` rewrites
//! intra-stylesheet references on the raw source, then `css-extract` routes
//! the resolved content into the single standalone stylesheet file the
//! css-extract plugin emits.

use std::path::Path;
use std::sync::LazyLock;

use frond_schema::{BuildProfile, LoaderKind, ModuleRule, OutputDescriptor};
use regex::{Captures, Regex};

use crate::error::PipelineError;

static URL_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"url\(([^)]+)\)").unwrap());

static IMPORT_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"@import\s+(['"])([^'"]+)['"]"#).unwrap());

/// Collects stylesheet content routed through the extract loader.
///
/// One instance lives for the duration of a build; [`CssPipeline::finish`]
/// yields the concatenated standalone stylesheet, in the order sources were
/// processed.
#[derive(Debug)]
pub struct CssPipeline {
    profile: BuildProfile,
    extracted: Vec<String>,
}

impl CssPipeline {
    /// Create a pipeline for the given build profile.
    pub fn new(profile: BuildProfile) -> Self {
        Self {
            profile,
            extracted: Vec::new(),
        }
    }

    /// Run one matched source file through the rule's loader chain.
    ///
    /// # Errors
    ///
    /// [`PipelineError::LoaderChain`] if the rule declares no loaders for a
    /// file it matched.
    pub fn process(
        &mut self,
        rule: &ModuleRule,
        path: &Path,
        source: &str,
    ) -> Result<(), PipelineError> {
        if rule.loaders.is_empty() {
            return Err(PipelineError::LoaderChain {
                step: "css-extract",
                path: path.to_path_buf(),
                reason: "rule matched but declares no loaders".to_string(),
            });
        }

        let mut text = source.to_string();
        // Right-to-left: the last declared loader transforms raw source first.
        for loader in rule.loaders.iter().rev() {
            match loader {
                LoaderKind::CssResolve => text = resolve_refs(&text, self.profile),
                LoaderKind::CssExtract => self.extracted.push(text.clone()),
            }
        }
        Ok(())
    }

    /// The finalized standalone stylesheet, or `None` if nothing was routed
    /// through the extract loader.
    pub fn finish(self) -> Option<String> {
        if self.extracted.is_empty() {
            None
        } else {
            Some(self.extracted.join("\n"))
        }
    }
}

/// Rewrite relative `url()` and `@import` references against the profile's
/// public base path. Absolute paths, full URLs, and data URIs pass through
/// untouched.
fn resolve_refs(css: &str, profile: BuildProfile) -> String {
    let rewritten = URL_REF.replace_all(css, |caps: &Captures<'_>| {
        let raw = caps[1].trim();
        let (quote, target) = match raw.as_bytes().first() {
            Some(b'\'') => ("'", raw.trim_matches('\'')),
            Some(b'"') => ("\"", raw.trim_matches('"')),
            _ => ("", raw),
        };
        if is_external(target) {
            caps[0].to_string()
        } else {
            format!(
                "url({quote}{}{quote})",
                OutputDescriptor::public_url(profile, target)
            )
        }
    });
    IMPORT_REF
        .replace_all(&rewritten, |caps: &Captures<'_>| {
            let quote = &caps[1];
            let target = &caps[2];
            if is_external(target) {
                caps[0].to_string()
            } else {
                format!(
                    "@import {quote}{}{quote}",
                    OutputDescriptor::public_url(profile, target)
                )
            }
        })
        .into_owned()
}

fn is_external(target: &str) -> bool {
    target.starts_with('/')
        || target.starts_with("http://")
        || target.starts_with("https://")
        || target.starts_with("data:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use frond_schema::LoaderKind;

    fn css_rule() -> ModuleRule {
        ModuleRule {
            extensions: vec!["css".to_string()],
            loaders: vec![LoaderKind::CssExtract, LoaderKind::CssResolve],
        }
    }

    #[test]
    fn resolve_runs_before_extract() {
        let mut pipeline = CssPipeline::new(BuildProfile::Static);
        pipeline
            .process(
                &css_rule(),
                Path::new("styles.css"),
                "body { background: url('bg.png'); }",
            )
            .unwrap();
        let sheet = pipeline.finish().unwrap();
        // The extracted content carries the already-resolved reference.
        assert_eq!(sheet, "body { background: url('/static/bg.png'); }");
    }

    #[test]
    fn root_profile_emits_root_relative_refs() {
        let mut pipeline = CssPipeline::new(BuildProfile::Root);
        pipeline
            .process(
                &css_rule(),
                Path::new("styles.css"),
                "@import \"reset.css\";",
            )
            .unwrap();
        assert_eq!(pipeline.finish().unwrap(), "@import \"/reset.css\";");
    }

    #[test]
    fn external_refs_pass_through() {
        let css = "a { background: url(data:image/png;base64,AAAA); } \
                   b { background: url('https://cdn.example/x.png'); } \
                   c { background: url(/already/abs.png); }";
        let mut pipeline = CssPipeline::new(BuildProfile::Static);
        pipeline.process(&css_rule(), Path::new("s.css"), css).unwrap();
        assert_eq!(pipeline.finish().unwrap(), css);
    }

    #[test]
    fn sources_concatenate_in_processing_order() {
        let mut pipeline = CssPipeline::new(BuildProfile::Root);
        pipeline
            .process(&css_rule(), Path::new("a.css"), "a { color: red }")
            .unwrap();
        pipeline
            .process(&css_rule(), Path::new("b.css"), "b { color: blue }")
            .unwrap();
        assert_eq!(
            pipeline.finish().unwrap(),
            "a { color: red }\nb { color: blue }"
        );
    }

    #[test]
    fn empty_chain_is_a_loader_error() {
        let rule = ModuleRule {
            extensions: vec!["css".to_string()],
            loaders: vec![],
        };
        let mut pipeline = CssPipeline::new(BuildProfile::Root);
        let err = pipeline
            .process(&rule, Path::new("s.css"), "a {}")
            .unwrap_err();
        assert!(matches!(err, PipelineError::LoaderChain { .. }));
    }

    #[test]
    fn nothing_matched_means_no_stylesheet() {
        let pipeline = CssPipeline::new(BuildProfile::Root);
        assert!(pipeline.finish().is_none());
    }
}
