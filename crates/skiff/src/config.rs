//! Configuration file (skiff.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub pages: PagesConfig,
    pub build: BuildSettings,
    pub dev: DevSettings,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PagesConfig {
    pub dir: PathBuf,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("pages"),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct BuildSettings {
    pub output: PathBuf,
    /// Copied verbatim into the output; `public = ""` disables it
    pub public: PathBuf,
    pub staging: PathBuf,
    pub minify_css: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            output: PathBuf::from("out"),
            public: PathBuf::from("public"),
            staging: PathBuf::from(".skiff"),
            minify_css: true,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct DevSettings {
    pub output: PathBuf,
    pub port: u16,
}

impl Default for DevSettings {
    fn default() -> Self {
        Self {
            output: PathBuf::from(".skiff/dev"),
            port: 3000,
        }
    }
}

impl Config {
    /// Load `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn public_dir(&self) -> Option<PathBuf> {
        if self.build.public.as_os_str().is_empty() {
            None
        } else {
            Some(self.build.public.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn missing_file_uses_defaults() {
        let temp = tempdir().unwrap();

        let config = Config::load(&temp.path().join("skiff.toml")).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.pages.dir, PathBuf::from("pages"));
        assert_eq!(config.dev.port, 3000);
        assert_eq!(config.public_dir(), Some(PathBuf::from("public")));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::parse(
            r#"
[pages]
dir = "site"

[build]
minify_css = false
public = ""

[dev]
port = 8080
"#,
        )
        .unwrap();

        assert_eq!(config.pages.dir, PathBuf::from("site"));
        assert!(!config.build.minify_css);
        assert_eq!(config.build.output, PathBuf::from("out"));
        assert_eq!(config.public_dir(), None);
        assert_eq!(config.dev.port, 8080);
        assert_eq!(config.dev.output, PathBuf::from(".skiff/dev"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("skiff.toml");
        fs::write(&path, "[build]\nminify_css = \"yes\"\n").unwrap();

        let err = Config::load(&path).unwrap_err();

        assert!(format!("{:#}", err).contains("Failed to parse"));
    }
}
