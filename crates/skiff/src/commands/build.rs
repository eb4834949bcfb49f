//! One-shot build command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use skiff_modules::{TemplateCompiler, TemplateLoader};
use skiff_static::{BuildConfig, Builder, ChangeSet};

use crate::config::Config;

/// Run the build command.
pub async fn run(
    config: Config,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    minify_css: bool,
) -> Result<()> {
    tracing::info!("Building site...");

    let public_dir = config.public_dir();
    let build = BuildConfig {
        pages_dir: input.unwrap_or(config.pages.dir),
        output_dir: output.unwrap_or(config.build.output),
        staging_dir: config.build.staging,
        public_dir,
        minify_css: minify_css && config.build.minify_css,
    };

    let mut builder = Builder::new(
        build,
        Arc::new(TemplateCompiler::new()),
        Arc::new(TemplateLoader::new()),
    )
    .context("Invalid build configuration")?;

    let result = builder.build(&ChangeSet::initial()).await;
    builder.finish().context("Failed to remove staging directory")?;
    let report = result?;

    if report.assets > 0 {
        tracing::info!("Copied {} public file(s)", report.assets);
    }
    tracing::info!("Output: {}", builder.config().output_dir.display());

    Ok(())
}
