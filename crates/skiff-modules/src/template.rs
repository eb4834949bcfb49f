//! Template components.
//!
//! A template page is an `.html` file rendered with minijinja. Its body is
//! the default export; an optional YAML frontmatter block declares the other
//! exports:
//!
//! ```yaml
//! paths: [first, second]          # or { collection: ../posts }
//! props: { site: Blog }
//! routes: { first: { title: First } }
//! head: "<title>{{ title }}</title>"
//! ```
//!
//! Compiling bundles every relative template import into a JSON artifact so
//! that loading never touches the source tree again.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use minijinja::{AutoEscape, Environment};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use skiff_markup::{render_markup, Component, RenderError, Scope};

use crate::collection::{list_entries, load_entry, render_markdown};
use crate::deps::normalize_path;
use crate::frontmatter::extract_frontmatter;
use crate::module::{Export, Module, DEFAULT_EXPORT, HEAD_EXPORT, PATHS_EXPORT, PROPS_EXPORT};
use crate::traits::{CompileError, Compiler, LoadError, ModuleLoader};

static TEMPLATE_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\{%-?\s*(?:include|import|from|extends)\s+(?:ignore\s+missing\s+)?["']([^"']+)["']"#,
    )
    .expect("Invalid template import regex")
});

const TEMPLATE_EXTENSIONS: &[&str] = &["html"];

/// Frontmatter accepted by template pages.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PageFrontmatter {
    #[serde(default)]
    paths: Option<Value>,
    #[serde(default)]
    props: Option<Value>,
    #[serde(default)]
    routes: Option<Value>,
    #[serde(default)]
    head: Option<Value>,
}

/// A compiled template page, as stored in staging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledTemplate {
    /// Absolute path of the source file
    pub source: PathBuf,

    /// Template body, without frontmatter
    pub body: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Value>,

    /// Imported templates by absolute path
    #[serde(default)]
    pub partials: BTreeMap<String, String>,
}

impl CompiledTemplate {
    fn main_name(&self) -> String {
        self.source.to_string_lossy().into_owned()
    }

    fn head_name(&self) -> String {
        format!("{}#head", self.main_name())
    }

    fn label(&self) -> String {
        self.source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "template".to_string())
    }

    /// The collection directory when `paths` names one.
    fn collection_dir(&self) -> Option<PathBuf> {
        collection_dir(self.paths.as_ref()?)
    }

    /// Build the template environment holding the body, the head template
    /// and every bundled partial.
    pub fn environment(&self) -> Result<Environment<'static>, minijinja::Error> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_: &str| AutoEscape::Html);
        env.set_path_join_callback(join_template_path);
        env.add_filter("markdown", markdown_filter);

        env.add_template_owned(self.main_name(), self.body.clone())?;
        if let Some(Value::String(head)) = &self.head {
            env.add_template_owned(self.head_name(), head.clone())?;
        }
        for (name, source) in &self.partials {
            env.add_template_owned(name.clone(), source.clone())?;
        }

        Ok(env)
    }
}

fn markdown_filter(value: &str) -> minijinja::Value {
    minijinja::Value::from_safe_string(render_markdown(value))
}

/// Resolve relative template names against the including template.
fn join_template_path<'s>(name: &'s str, parent: &'s str) -> Cow<'s, str> {
    if !name.starts_with('.') {
        return Cow::Borrowed(name);
    }

    let parent = parent.strip_suffix("#head").unwrap_or(parent);
    let dir = Path::new(parent).parent().unwrap_or(Path::new(""));
    Cow::Owned(normalize_path(&dir.join(name)).to_string_lossy().into_owned())
}

fn collection_dir(paths: &Value) -> Option<PathBuf> {
    let map = paths.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.get("collection")?.as_str().map(PathBuf::from)
}

/// Relative templates imported by `content`, resolved against `source`.
fn template_imports(source: &Path, content: &str) -> Vec<PathBuf> {
    let dir = source.parent().unwrap_or(Path::new(""));

    TEMPLATE_IMPORT_RE
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .filter(|name| name.starts_with('.'))
        .map(|name| normalize_path(&dir.join(name)))
        .collect()
}

/// Compiles `.html` template pages into JSON artifacts.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateCompiler;

impl TemplateCompiler {
    pub fn new() -> Self {
        Self
    }

    fn bundle_partials(
        &self,
        source: &Path,
        contents: &[&str],
    ) -> Result<BTreeMap<String, String>, CompileError> {
        let mut partials = BTreeMap::new();
        let mut pending: Vec<PathBuf> = contents
            .iter()
            .flat_map(|content| template_imports(source, content))
            .collect();

        while let Some(path) = pending.pop() {
            let name = path.to_string_lossy().into_owned();
            if path == source || partials.contains_key(&name) {
                continue;
            }

            let content = fs::read_to_string(&path).map_err(|e| CompileError::Read {
                path: path.clone(),
                message: e.to_string(),
            })?;

            pending.extend(template_imports(&path, &content));
            partials.insert(name, content);
        }

        Ok(partials)
    }
}

impl Compiler for TemplateCompiler {
    fn name(&self) -> &'static str {
        "template"
    }

    fn extensions(&self) -> &[&'static str] {
        TEMPLATE_EXTENSIONS
    }

    fn compile(&self, source: &Path, output: &Path) -> Result<(), CompileError> {
        let read_error = |e: io::Error| CompileError::Read {
            path: source.to_path_buf(),
            message: e.to_string(),
        };

        let absolute = normalize_path(&std::path::absolute(source).map_err(read_error)?);
        let text = fs::read_to_string(source).map_err(read_error)?;

        let (frontmatter, body) = extract_frontmatter::<PageFrontmatter>(&text).map_err(|e| {
            CompileError::Frontmatter {
                path: source.to_path_buf(),
                message: e.to_string(),
            }
        })?;
        let frontmatter = frontmatter.unwrap_or_default();

        // Collection directories are stored absolute so the artifact can be
        // loaded from anywhere.
        let dir = absolute.parent().unwrap_or(Path::new("")).to_path_buf();
        let paths = frontmatter.paths.map(|paths| match collection_dir(&paths) {
            Some(collection) => {
                let resolved = normalize_path(&dir.join(collection));
                serde_json::json!({ "collection": resolved.to_string_lossy() })
            }
            None => paths,
        });

        let mut imports = vec![body];
        if let Some(Value::String(head)) = &frontmatter.head {
            imports.push(head.as_str());
        }
        let partials = self.bundle_partials(&absolute, &imports)?;

        let compiled = CompiledTemplate {
            source: absolute,
            body: body.to_string(),
            paths,
            props: frontmatter.props,
            routes: frontmatter.routes,
            head: frontmatter.head,
            partials,
        };

        compiled
            .environment()
            .map_err(|e| CompileError::Syntax {
                path: source.to_path_buf(),
                message: e.to_string(),
            })?;

        let write_error = |message: String| CompileError::Write {
            path: output.to_path_buf(),
            message,
        };

        let json = serde_json::to_string_pretty(&compiled).map_err(|e| write_error(e.to_string()))?;
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;
        }
        fs::write(output, json).map_err(|e| write_error(e.to_string()))?;

        tracing::trace!("Compiled {} -> {}", source.display(), output.display());
        Ok(())
    }

    fn artifact_path(&self, staging: &Path, relative: &Path) -> PathBuf {
        let mut path = staging.join(relative).into_os_string();
        path.push(".json");
        PathBuf::from(path)
    }
}

/// Loads artifacts written by [`TemplateCompiler`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateLoader;

impl TemplateLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ModuleLoader for TemplateLoader {
    fn load(&self, artifact: &Path) -> Result<Module, LoadError> {
        let json = match fs::read_to_string(artifact) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LoadError::NotFound(artifact.to_path_buf()))
            }
            Err(e) => {
                return Err(LoadError::Read {
                    path: artifact.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };

        let compiled: CompiledTemplate = serde_json::from_str(&json)
            .map_err(|e| LoadError::Invalid(format!("{}: {}", artifact.display(), e)))?;

        template_module(compiled)
            .map_err(|e| LoadError::Invalid(format!("{}: {}", artifact.display(), e)))
    }
}

/// A component rendering the template `name` with the props' values, then
/// turning the output into an element tree.
fn template_component(env: Arc<Environment<'static>>, name: String, label: String) -> Component {
    Component::new(label, move |cx, props| {
        let html = env
            .get_template(&name)
            .and_then(|template| template.render(&props.values))
            .map_err(|e| RenderError::Template(e.to_string()))?;

        let scope = Scope::new().with_props(&props);
        render_markup(&html, cx, &scope)
    })
}

fn paths_export(paths: Value) -> Export {
    if let Some(dir) = collection_dir(&paths) {
        return Export::Paths(Arc::new(move || list_entries(&dir)));
    }

    match paths {
        Value::Array(items) if items.iter().all(Value::is_string) => {
            let keys: Vec<String> = items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect();
            Export::Paths(Arc::new(move || Ok::<_, RenderError>(keys.clone())))
        }
        other => Export::Value(other),
    }
}

/// The props getter: shared `props`, then the route's entry in `routes`,
/// then the collection `entry` for the key.
fn props_export(
    props: Option<Value>,
    routes: Option<Value>,
    collection: Option<PathBuf>,
) -> Option<Export> {
    if props.is_none() && routes.is_none() && collection.is_none() {
        return None;
    }

    let shared = match props {
        None => Map::new(),
        Some(Value::Object(values)) => values,
        Some(other) => return Some(Export::Value(other)),
    };

    let routes = match routes {
        None => Map::new(),
        Some(Value::Object(routes)) if routes.values().all(Value::is_object) => routes,
        Some(other) => return Some(Export::Value(other)),
    };

    Some(Export::Props(Arc::new(
        move |key: Option<&str>| -> Result<Value, RenderError> {
            let mut values = shared.clone();

            if let Some(key) = key {
                if let Some(Value::Object(route)) = routes.get(key) {
                    values.extend(route.clone());
                }
                if let Some(dir) = &collection {
                    values.insert("entry".to_string(), load_entry(dir, key)?);
                }
            }

            Ok(Value::Object(values))
        },
    )))
}

fn template_module(compiled: CompiledTemplate) -> Result<Module, minijinja::Error> {
    let env = Arc::new(compiled.environment()?);
    let label = compiled.label();
    let mut module = Module::new();

    if !compiled.body.trim().is_empty() {
        module.insert(
            DEFAULT_EXPORT,
            Export::Component(template_component(
                env.clone(),
                compiled.main_name(),
                label.clone(),
            )),
        );
    }

    let collection = compiled.collection_dir();
    if let Some(paths) = compiled.paths.clone() {
        module.insert(PATHS_EXPORT, paths_export(paths));
    }

    if let Some(export) = props_export(compiled.props.clone(), compiled.routes.clone(), collection)
    {
        module.insert(PROPS_EXPORT, export);
    }

    match compiled.head.clone() {
        None => {}
        Some(Value::String(_)) => module.insert(
            HEAD_EXPORT,
            Export::Component(template_component(
                env,
                compiled.head_name(),
                format!("{}#head", label),
            )),
        ),
        Some(other) => module.insert(HEAD_EXPORT, Export::Value(other)),
    }

    Ok(module)
}
