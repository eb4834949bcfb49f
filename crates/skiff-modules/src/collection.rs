//! Markdown collections.
//!
//! A collection is a directory of `.md` files. Each file stem is a route key;
//! loading an entry renders its body to HTML and exposes its frontmatter.

use std::fs;
use std::path::Path;

use pulldown_cmark::{html, Options, Parser};
use serde_json::{Map, Value};
use skiff_markup::RenderError;

use crate::frontmatter::extract_frontmatter;

const ENTRY_EXTENSION: &str = "md";

/// Render markdown to HTML.
pub fn render_markdown(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_FOOTNOTES);

    let parser = Parser::new_ext(source, options);
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Stems of the markdown files directly inside `dir`, sorted.
pub fn list_entries(dir: &Path) -> Result<Vec<String>, RenderError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| RenderError::Hook(format!("Failed to list {}: {}", dir.display(), e)))?;

    let mut slugs = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| RenderError::Hook(format!("Failed to list {}: {}", dir.display(), e)))?
            .path();

        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
            continue;
        }

        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            slugs.push(stem.to_string());
        }
    }

    slugs.sort();
    Ok(slugs)
}

/// Load the entry `slug` of the collection in `dir`.
///
/// The result holds the entry's frontmatter fields plus `slug` and the
/// rendered `content`.
pub fn load_entry(dir: &Path, slug: &str) -> Result<Value, RenderError> {
    let path = dir.join(format!("{}.{}", slug, ENTRY_EXTENSION));
    let source = fs::read_to_string(&path)
        .map_err(|e| RenderError::Hook(format!("Failed to read {}: {}", path.display(), e)))?;

    let (frontmatter, body) = extract_frontmatter::<Map<String, Value>>(&source)
        .map_err(|e| RenderError::Hook(format!("{}: {}", path.display(), e)))?;

    let mut entry = frontmatter.unwrap_or_default();
    entry.insert("slug".to_string(), Value::String(slug.to_string()));
    entry.insert("content".to_string(), Value::String(render_markdown(body)));

    Ok(Value::Object(entry))
}
