//! Loaded modules and their exports.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use skiff_markup::{Component, RenderError};

/// Name of the export holding the page or shell component.
pub const DEFAULT_EXPORT: &str = "default";
/// Name of the export listing dynamic route keys.
pub const PATHS_EXPORT: &str = "getPaths";
/// Name of the export producing props for a route key.
pub const PROPS_EXPORT: &str = "getProps";
/// Name of the export rendering head contents.
pub const HEAD_EXPORT: &str = "Head";

/// Lists the route keys of a dynamic page.
pub type PathLister = Arc<dyn Fn() -> Result<Vec<String>, RenderError> + Send + Sync>;

/// Produces the props of a route from its key.
pub type PropsGetter = Arc<dyn Fn(Option<&str>) -> Result<Value, RenderError> + Send + Sync>;

/// A named export of a module.
#[derive(Clone)]
pub enum Export {
    Component(Component),
    Paths(PathLister),
    Props(PropsGetter),
    /// Plain data, which is never callable
    Value(Value),
}

impl Export {
    /// Short description used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Export::Component(_) => "component",
            Export::Paths(_) => "path lister",
            Export::Props(_) => "props getter",
            Export::Value(_) => "value",
        }
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Export::Component(component) => f.debug_tuple("Component").field(component).finish(),
            Export::Value(value) => f.debug_tuple("Value").field(value).finish(),
            other => f.write_str(other.kind()),
        }
    }
}

/// The exports of a loaded module, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Module {
    exports: IndexMap<String, Export>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Module::insert`].
    pub fn with(mut self, name: impl Into<String>, export: Export) -> Self {
        self.insert(name, export);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, export: Export) {
        self.exports.insert(name.into(), export);
    }

    pub fn get(&self, name: &str) -> Option<&Export> {
        self.exports.get(name)
    }

    /// Export names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.exports.keys().map(String::as_str)
    }
}
