//! Trait definitions for component compilers and module loaders.

use std::path::{Path, PathBuf};

use crate::module::Module;

/// Errors that can occur while compiling a source file.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },

    #[error("Invalid frontmatter in {path}: {message}")]
    Frontmatter { path: PathBuf, message: String },

    #[error("Template error in {path}: {message}")]
    Syntax { path: PathBuf, message: String },
}

/// Errors that can occur while loading a compiled module.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Module not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("{0}")]
    Invalid(String),
}

/// Turns a source file into a loadable artifact.
///
/// Compilers must be free of shared mutable state: the builder compiles
/// distinct files in parallel.
pub trait Compiler: Send + Sync {
    /// Compiler identifier (e.g., "template")
    fn name(&self) -> &'static str;

    /// Source file extensions this compiler handles, without the dot
    fn extensions(&self) -> &[&'static str];

    /// Compile `source` into the artifact at `output`.
    fn compile(&self, source: &Path, output: &Path) -> Result<(), CompileError>;

    /// Where the artifact for `relative` (a path relative to the pages
    /// directory) lives inside `staging`.
    fn artifact_path(&self, staging: &Path, relative: &Path) -> PathBuf {
        staging.join(relative)
    }
}

/// Loads compiled artifacts into modules.
pub trait ModuleLoader: Send + Sync {
    /// Load the module compiled to `artifact`.
    ///
    /// Implementations must evaluate the artifact on every call and never
    /// hand out a previously loaded module, since the same path is recompiled
    /// over and over during a dev session. A missing artifact is reported as
    /// [`LoadError::NotFound`].
    fn load(&self, artifact: &Path) -> Result<Module, LoadError>;
}
