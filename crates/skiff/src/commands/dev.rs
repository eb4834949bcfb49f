//! Development server command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use skiff_modules::{TemplateCompiler, TemplateLoader};
use skiff_server::{DevServer, DevServerConfig};
use skiff_static::{BuildConfig, Builder};

use crate::config::Config;

/// Run the dev server.
pub async fn run(
    config: Config,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    port: Option<u16>,
    open: bool,
) -> Result<()> {
    let port = port.unwrap_or(config.dev.port);
    tracing::info!("Starting development server on port {}", port);

    let public_dir = config.public_dir();
    let build = BuildConfig {
        pages_dir: input.unwrap_or(config.pages.dir),
        output_dir: output.unwrap_or(config.dev.output),
        // Kept apart from the default dev output, which lives under staging
        staging_dir: config.build.staging.join("modules"),
        public_dir,
        minify_css: config.build.minify_css,
    };

    let builder = Builder::new(
        build,
        Arc::new(TemplateCompiler::new()),
        Arc::new(TemplateLoader::new()),
    )
    .context("Invalid build configuration")?;

    let server = DevServerConfig {
        port,
        open,
        ..Default::default()
    };

    DevServer::new(server, builder).start().await?;

    Ok(())
}
