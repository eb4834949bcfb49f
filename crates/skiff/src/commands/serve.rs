//! Preview server command.

use std::path::PathBuf;

use anyhow::Result;
use skiff_server::DevServerConfig;

use crate::config::Config;

/// Serve a built site without watching or rebuilding.
pub async fn run(config: Config, dir: Option<PathBuf>, port: u16, open: bool) -> Result<()> {
    let dir = dir.unwrap_or(config.build.output);
    let server = DevServerConfig {
        root: dir.clone(),
        port,
        open,
        ..Default::default()
    };

    skiff_server::preview(&dir, &server).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn unbuilt_site_is_an_error() {
        let temp = tempdir().unwrap();

        let err = run(Config::default(), Some(temp.path().join("out")), 0, false)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Run 'skiff build' first"));
    }
}
