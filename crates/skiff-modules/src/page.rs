//! Page loading and export validation.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use skiff_markup::{Component, RenderError};

use crate::module::{
    Export, PathLister, PropsGetter, DEFAULT_EXPORT, HEAD_EXPORT, PATHS_EXPORT, PROPS_EXPORT,
};
use crate::traits::{LoadError, ModuleLoader};

/// Errors raised when a module does not honour the page or component contract.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Malformed page ({path}): {reason}")]
    MalformedPage { path: PathBuf, reason: String },

    #[error("Malformed component ({path}): {reason}")]
    MalformedComponent { path: PathBuf, reason: String },
}

/// A validated page module with optional exports normalized.
#[derive(Clone)]
pub struct Page {
    /// Renders the page from its props
    pub render: Component,

    /// Lists route keys; `None` for a page with a single route
    pub paths: Option<PathLister>,

    /// Produces props for a route key; an empty object when not exported
    pub props: PropsGetter,

    /// Renders head contents from the page props
    pub head: Option<Component>,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("render", &self.render)
            .field("paths", &self.paths.is_some())
            .field("head", &self.head)
            .finish()
    }
}

fn empty_props() -> PropsGetter {
    Arc::new(|_: Option<&str>| Ok::<_, RenderError>(Value::Object(Map::new())))
}

/// Load and validate a page module.
pub fn load_page(loader: &dyn ModuleLoader, artifact: &Path) -> Result<Page, PageError> {
    let malformed = |reason: String| PageError::MalformedPage {
        path: artifact.to_path_buf(),
        reason,
    };

    let module = loader.load(artifact).map_err(|e| malformed(e.to_string()))?;

    let render = match module.get(DEFAULT_EXPORT) {
        Some(Export::Component(component)) => component.clone(),
        _ => return Err(malformed("does not export a default component".to_string())),
    };

    let props = match module.get(PROPS_EXPORT) {
        None => empty_props(),
        Some(Export::Props(getter)) => getter.clone(),
        Some(other) => {
            return Err(malformed(format!(
                "has an invalid `{}` export ({})",
                PROPS_EXPORT,
                other.kind()
            )))
        }
    };

    let paths = match module.get(PATHS_EXPORT) {
        None => None,
        Some(Export::Paths(lister)) => Some(lister.clone()),
        Some(other) => {
            return Err(malformed(format!(
                "has an invalid `{}` export ({})",
                PATHS_EXPORT,
                other.kind()
            )))
        }
    };

    let head = match module.get(HEAD_EXPORT) {
        None => None,
        Some(Export::Component(component)) => Some(component.clone()),
        Some(other) => {
            return Err(malformed(format!(
                "has an invalid `{}` export ({})",
                HEAD_EXPORT,
                other.kind()
            )))
        }
    };

    Ok(Page {
        render,
        paths,
        props,
        head,
    })
}

/// Load the default component of an optional module such as the document
/// shell. Returns `None` when the module does not exist.
pub fn load_component(
    loader: &dyn ModuleLoader,
    artifact: &Path,
) -> Result<Option<Component>, PageError> {
    let malformed = |reason: String| PageError::MalformedComponent {
        path: artifact.to_path_buf(),
        reason,
    };

    let module = match loader.load(artifact) {
        Ok(module) => module,
        Err(LoadError::NotFound(_)) => return Ok(None),
        Err(e) => return Err(malformed(e.to_string())),
    };

    match module.get(DEFAULT_EXPORT) {
        Some(Export::Component(component)) => Ok(Some(component.clone())),
        _ => Err(malformed("default export is not a component".to_string())),
    }
}
