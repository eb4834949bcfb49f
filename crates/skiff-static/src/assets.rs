//! Public asset copying and CSS processing.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::builder::BuildError;

/// Asset pipeline utilities.
pub struct AssetPipeline;

impl AssetPipeline {
    /// Minify CSS using lightningcss.
    pub fn minify_css(css: &str) -> Result<String, String> {
        use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

        let stylesheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| format!("CSS parse error: {}", e))?;

        let minified = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                ..Default::default()
            })
            .map_err(|e| format!("CSS minify error: {}", e))?;

        Ok(minified.code)
    }
}

/// The public directory, mirrored into the output root.
#[derive(Debug, Clone)]
pub struct PublicAssets {
    dir: PathBuf,
    output: PathBuf,
    minify_css: bool,
}

impl PublicAssets {
    pub fn new(dir: impl Into<PathBuf>, output: impl Into<PathBuf>, minify_css: bool) -> Self {
        Self {
            dir: dir.into(),
            output: output.into(),
            minify_css,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether `path` lies inside the public directory.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.dir)
    }

    fn target(&self, path: &Path) -> Option<PathBuf> {
        let relative = path.strip_prefix(&self.dir).ok()?;
        Some(self.output.join(relative))
    }

    /// Copy the whole public directory. Returns the number of files copied;
    /// a missing directory copies nothing.
    pub fn copy_all(&self) -> Result<usize, BuildError> {
        if !self.dir.is_dir() {
            return Ok(0);
        }
        self.copy_tree(&self.dir)
    }

    /// Copy the file or directory at `path`.
    pub fn copy(&self, path: &Path) -> Result<usize, BuildError> {
        if path.is_dir() {
            self.copy_tree(path)
        } else {
            self.copy_file(path).map(|_| 1)
        }
    }

    fn copy_tree(&self, root: &Path) -> Result<usize, BuildError> {
        let mut copied = 0;

        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() {
                self.copy_file(entry.path())?;
                copied += 1;
            }
        }

        Ok(copied)
    }

    fn copy_file(&self, path: &Path) -> Result<(), BuildError> {
        let Some(target) = self.target(path) else {
            return Ok(());
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::WriteError(e.to_string()))?;
        }

        let is_css = path.extension().and_then(|e| e.to_str()) == Some("css");
        if self.minify_css && is_css {
            let css = fs::read_to_string(path).map_err(|e| BuildError::ReadError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            let css = AssetPipeline::minify_css(&css).unwrap_or_else(|e| {
                tracing::warn!("Copying {} unminified: {}", path.display(), e);
                css
            });
            fs::write(&target, css).map_err(|e| BuildError::WriteError(e.to_string()))?;
        } else {
            fs::copy(path, &target).map_err(|e| BuildError::WriteError(e.to_string()))?;
        }

        tracing::trace!("Copied {}", path.display());
        Ok(())
    }

    /// Remove the copy of `path` from the output. Missing copies are ignored.
    pub fn remove(&self, path: &Path) -> Result<(), BuildError> {
        let Some(target) = self.target(path) else {
            return Ok(());
        };

        let result = if target.is_dir() {
            fs::remove_dir_all(&target)
        } else if target.exists() {
            fs::remove_file(&target)
        } else {
            Ok(())
        };

        result.map_err(|e| BuildError::WriteError(e.to_string()))
    }
}
