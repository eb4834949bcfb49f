//! Route resolution.

use std::path::{Component, Path, PathBuf};

use serde_json::{json, Value};
use skiff_markup::RenderError;
use skiff_modules::Page;

/// Prop under which pages and the wrapper receive the route being rendered.
pub const ROUTE_PROP: &str = "route";

/// Errors raised while listing the routes of a page.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("path lister failed: {0}")]
    Paths(#[from] RenderError),

    #[error("invalid route key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },
}

/// A single output location of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Location relative to the output root; empty for the root
    pub path: PathBuf,

    /// Value handed to the page's props getter
    pub key: String,
}

impl Route {
    /// The route as a URL path (`/`, `/blog/post`).
    pub fn url(&self) -> String {
        url_path(&self.path)
    }

    /// The file this route is written to below `output`.
    pub fn output_file(&self, output: &Path) -> PathBuf {
        output.join(&self.path).join("index.html")
    }

    /// What a page rendered for this route learns about itself. `source` is
    /// the page source relative to the pages directory.
    ///
    /// ```json
    /// { "url": "/blog/a", "key": "a", "dir": "blog", "source": "blog/[slug].html" }
    /// ```
    pub fn context(&self, source: &Path) -> Value {
        json!({
            "url": self.url(),
            "key": self.key,
            "dir": slash_path(source.parent().unwrap_or(Path::new(""))),
            "source": slash_path(source),
        })
    }
}

/// `path` with `/` separators and without `.`/`..`/root components.
fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(segment) => Some(segment.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn url_path(path: &Path) -> String {
    format!("/{}", slash_path(path))
}

fn validate_key(key: &str) -> Result<(), RouteError> {
    let invalid = |reason| RouteError::InvalidKey {
        key: key.to_string(),
        reason,
    };

    if key.is_empty() {
        return Err(invalid("empty"));
    }
    if key.starts_with('/') || Path::new(key).is_absolute() {
        return Err(invalid("absolute"));
    }
    if Path::new(key)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(invalid("contains `..`"));
    }

    Ok(())
}

/// Routes of `page`, whose source sits in `page_dir` (relative to the pages
/// directory) with file stem `stem`.
///
/// Without a path lister the page has one route: `page_dir` for an `index`
/// page, `page_dir/stem` otherwise, keyed by that same path (`about`,
/// `blog`, empty for the root). With a path lister
/// every returned key becomes `page_dir/key` and is passed to the props getter
/// unchanged.
pub fn resolve_routes(page: &Page, page_dir: &Path, stem: &str) -> Result<Vec<Route>, RouteError> {
    let Some(lister) = &page.paths else {
        let path = if stem == "index" {
            page_dir.to_path_buf()
        } else {
            page_dir.join(stem)
        };
        let key = slash_path(&path);
        return Ok(vec![Route { path, key }]);
    };

    lister()?
        .into_iter()
        .map(|key| -> Result<Route, RouteError> {
            validate_key(&key)?;
            Ok(Route {
                path: page_dir.join(&key),
                key,
            })
        })
        .collect()
}
