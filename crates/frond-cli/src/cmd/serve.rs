//! Serve command - local preview of a built bundle.
//!
//! Mounts the output directory the way the deployment will: under the
//! profile's public base path, with the shell at the site root.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result, bail};
use axum::Router;
use axum::handler::HandlerWithoutStateExt;
use axum::http::StatusCode;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use frond_schema::{BuildProfile, FrondConfig};

use crate::ui::Output;

async fn handle_404() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

/// Serve the built output directory on localhost.
pub async fn serve(dir: &Path, profile_flag: Option<BuildProfile>, port: u16) -> Result<()> {
    let output = Output::new();

    let config = FrondConfig::load(&dir.join("frond.toml")).context("loading frond.toml")?;
    let profile = config.resolve_profile(profile_flag)?;
    let output_dir = dir.join(&config.output.dir);
    if !output_dir.is_dir() {
        bail!(
            "no build output at {}; run `frond build` first",
            output_dir.display()
        );
    }

    let not_found_service = handle_404.into_service();

    let app = match profile.public_path() {
        Some(base) => Router::new()
            .nest_service(
                base.trim_end_matches('/'),
                ServeDir::new(&output_dir).not_found_service(not_found_service),
            )
            .route_service("/", ServeFile::new(output_dir.join("index.html"))),
        None => Router::new()
            .fallback_service(ServeDir::new(&output_dir).not_found_service(not_found_service)),
    }
    .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    output.info(&format!(
        "serving {} at http://{addr}/ (profile \"{profile}\")",
        output_dir.display()
    ));
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
