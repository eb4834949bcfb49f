//! Incremental static site builder.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use walkdir::WalkDir;

use skiff_markup::{Component, HeadContents, Node, Props, RenderContext, RenderError};
use skiff_modules::{
    load_page, local_dependencies, normalize_path, CompileError, Compiler, ModuleLoader, Page,
    PageError,
};

use crate::assets::PublicAssets;
use crate::cache::DependencyCache;
use crate::changes::{ChangeKind, ChangeSet};
use crate::document::{
    check_anchors, inject, resolve_document, resolve_wrapper, DocumentError, APP_MODULE,
    DOCUMENT_MODULE,
};
use crate::routes::{resolve_routes, Route, ROUTE_PROP};

const DOCTYPE: &str = "<!DOCTYPE html>";

/// Configuration for building a site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Page sources
    pub pages_dir: PathBuf,

    /// Output directory, wiped on initial passes
    pub output_dir: PathBuf,

    /// Where compiled pages are kept between passes
    pub staging_dir: PathBuf,

    /// Files copied verbatim into the output
    pub public_dir: Option<PathBuf>,

    /// Minify public stylesheets
    pub minify_css: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            pages_dir: PathBuf::from("pages"),
            output_dir: PathBuf::from("out"),
            staging_dir: PathBuf::from(".skiff"),
            public_dir: Some(PathBuf::from("public")),
            minify_css: true,
        }
    }
}

/// Summary of a build pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Pages rendered
    pub pages: usize,

    /// Route files written
    pub routes: usize,

    /// Output files removed
    pub removed: usize,

    /// Public files copied
    pub assets: usize,

    /// Total pass time in milliseconds
    pub duration_ms: u64,
}

/// Errors that can occur during a build pass.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("The input and output directories must not be the same: {0}")]
    SameDirectories(PathBuf),

    #[error("Pages directory not found: {0}")]
    MissingPages(PathBuf),

    #[error("Failed to read {path}: {message}")]
    ReadError { path: PathBuf, message: String },

    #[error("Failed to write output: {0}")]
    WriteError(String),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Page(#[from] PageError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Failed to render {path}: {source}")]
    Render { path: PathBuf, source: RenderError },
}

impl BuildError {
    /// Whether the error is a configuration problem no later pass can fix.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BuildError::SameDirectories(_))
    }
}

/// A page compiled in the current pass.
struct Compiled {
    source: PathBuf,
    relative: PathBuf,
    artifact: PathBuf,
    dependencies: Vec<PathBuf>,
}

/// A route rendered in memory, waiting to be written.
struct RenderedRoute {
    source: PathBuf,
    output: PathBuf,
    html: String,
}

fn absolute(path: &Path) -> Result<PathBuf, BuildError> {
    std::path::absolute(path)
        .map(|p| normalize_path(&p))
        .map_err(|e| BuildError::ReadError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

fn file_stem(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("")
}

/// Whether `relative` is the document shell or the wrapper.
fn is_shell(relative: &Path) -> bool {
    matches!(file_stem(relative), DOCUMENT_MODULE | APP_MODULE)
}

/// Incremental static site builder.
///
/// Owns the dependency cache and the head contents for the lifetime of a
/// session. Passes must not overlap; [`Builder::build`] takes `&mut self`.
pub struct Builder {
    config: BuildConfig,
    compiler: Arc<dyn Compiler>,
    loader: Arc<dyn ModuleLoader>,
    cache: DependencyCache,
    head: HeadContents,
    public: Option<PublicAssets>,

    /// Compiled pages, relative source path → artifact
    staged: BTreeMap<PathBuf, PathBuf>,

    /// Pages compiled but not yet written successfully
    pending: BTreeSet<PathBuf>,

    /// Whether every page must be rendered on the next pass
    shell_changed: bool,
}

impl Builder {
    /// Create a builder. Fails when the pages and output directories are the
    /// same.
    pub fn new(
        config: BuildConfig,
        compiler: Arc<dyn Compiler>,
        loader: Arc<dyn ModuleLoader>,
    ) -> Result<Self, BuildError> {
        let config = BuildConfig {
            pages_dir: absolute(&config.pages_dir)?,
            output_dir: absolute(&config.output_dir)?,
            staging_dir: absolute(&config.staging_dir)?,
            public_dir: config.public_dir.as_deref().map(absolute).transpose()?,
            minify_css: config.minify_css,
        };

        if config.pages_dir == config.output_dir {
            return Err(BuildError::SameDirectories(config.pages_dir));
        }

        let public = config
            .public_dir
            .as_ref()
            .map(|dir| PublicAssets::new(dir, &config.output_dir, config.minify_css));

        Ok(Self {
            config,
            compiler,
            loader,
            cache: DependencyCache::new(),
            head: HeadContents::new(),
            public,
            staged: BTreeMap::new(),
            pending: BTreeSet::new(),
            shell_changed: true,
        })
    }

    /// The configuration with every directory made absolute.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn cache(&self) -> &DependencyCache {
        &self.cache
    }

    /// Add nodes to the head of every page rendered from now on.
    pub fn inject_head(&mut self, nodes: impl IntoIterator<Item = Node>) {
        self.head.inject_static(nodes);
    }

    /// Run one build pass.
    pub async fn build(&mut self, changes: &ChangeSet) -> Result<BuildReport, BuildError> {
        let start = Instant::now();
        let mut report = BuildReport::default();

        let to_compile = if changes.initial {
            tracing::debug!("Phase: clean");
            self.clean()?;
            if let Some(public) = &self.public {
                report.assets = public.copy_all()?;
            }
            self.discover_sources()?
        } else {
            self.apply_changes(changes, &mut report)?
        };

        tracing::debug!("Phase: compiling {} files", to_compile.len());
        self.compile(&to_compile)?;

        tracing::debug!("Phase: resolving document and wrapper");
        let document = resolve_document(
            self.loader.as_ref(),
            self.shell_artifact(DOCUMENT_MODULE).as_deref(),
        )?;
        check_anchors(&document)?;
        let wrapper = resolve_wrapper(
            self.loader.as_ref(),
            self.shell_artifact(APP_MODULE).as_deref(),
        )?;

        let render_set: Vec<PathBuf> = if changes.initial || self.shell_changed {
            self.staged.keys().cloned().collect()
        } else {
            self.pending.iter().cloned().collect()
        };

        tracing::debug!("Phase: rendering {} pages", render_set.len());
        let mut rendered = Vec::new();
        for relative in &render_set {
            if is_shell(relative) {
                continue;
            }
            rendered.extend(self.render_page(relative, &document, &wrapper)?);
            report.pages += 1;
        }

        tracing::debug!("Phase: persisting {} routes", rendered.len());
        self.persist(&render_set, rendered, &mut report).await?;

        self.pending.clear();
        self.shell_changed = false;

        report.duration_ms = start.elapsed().as_millis() as u64;
        tracing::debug!("Phase: done");
        tracing::info!(
            "Built {} routes from {} pages in {}ms",
            report.routes,
            report.pages,
            report.duration_ms
        );

        Ok(report)
    }

    /// Remove the staging directory. Called once a one-shot build is done.
    pub fn finish(&mut self) -> Result<(), BuildError> {
        if self.config.staging_dir.exists() {
            fs::remove_dir_all(&self.config.staging_dir)
                .map_err(|e| BuildError::WriteError(e.to_string()))?;
        }
        self.staged.clear();
        Ok(())
    }

    fn clean(&mut self) -> Result<(), BuildError> {
        if !self.config.pages_dir.is_dir() {
            return Err(BuildError::MissingPages(self.config.pages_dir.clone()));
        }

        for dir in [&self.config.output_dir, &self.config.staging_dir] {
            if dir.exists() {
                fs::remove_dir_all(dir).map_err(|e| BuildError::WriteError(e.to_string()))?;
            }
            fs::create_dir_all(dir).map_err(|e| BuildError::WriteError(e.to_string()))?;
        }

        self.cache.clear();
        self.staged.clear();
        self.pending.clear();
        self.shell_changed = true;
        Ok(())
    }

    /// Whether `path` is ignored by the builder: output and staging files
    /// never count as sources.
    fn is_ignored(&self, path: &Path) -> bool {
        path.starts_with(&self.config.output_dir) || path.starts_with(&self.config.staging_dir)
    }

    fn is_source(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        path.starts_with(&self.config.pages_dir)
            && !self.is_ignored(path)
            && self.compiler.extensions().contains(&ext)
    }

    /// Every source file below the pages directory.
    fn discover_sources(&self) -> Result<BTreeSet<PathBuf>, BuildError> {
        if !self.config.pages_dir.is_dir() {
            return Err(BuildError::MissingPages(self.config.pages_dir.clone()));
        }
        Ok(self.sources_in(&self.config.pages_dir))
    }

    /// Source files at or below `root`.
    fn sources_in(&self, root: &Path) -> BTreeSet<PathBuf> {
        let mut sources = BTreeSet::new();

        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| !self.is_ignored(e.path()))
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() && self.is_source(entry.path()) {
                sources.insert(entry.path().to_path_buf());
            }
        }

        sources
    }

    /// Apply an incremental change set and return the sources to compile.
    /// Removals are handled first.
    fn apply_changes(
        &mut self,
        changes: &ChangeSet,
        report: &mut BuildReport,
    ) -> Result<BTreeSet<PathBuf>, BuildError> {
        let mut to_compile = BTreeSet::new();
        let mut changed = Vec::new();

        for change in &changes.changes {
            let path = absolute(&change.path)?;
            if self.is_ignored(&path) {
                continue;
            }
            if change.kind == ChangeKind::Removed {
                report.removed += self.remove_path(&path)?;
            }
            changed.push((change.kind, path));
        }

        for (kind, path) in changed {
            if let Some(public) = self.public.as_ref().filter(|p| p.contains(&path)) {
                if kind != ChangeKind::Removed {
                    report.assets += public.copy(&path)?;
                }
                continue;
            }

            if kind != ChangeKind::Removed && path.starts_with(&self.config.pages_dir) {
                to_compile.extend(self.sources_in(&path));
            }

            for dependent in self.cache.dependents_of(&path) {
                if dependent.is_file() {
                    tracing::debug!(
                        "{} changed, rebuilding {}",
                        path.display(),
                        dependent.display()
                    );
                    to_compile.insert(dependent);
                }
            }
        }

        Ok(to_compile)
    }

    /// Drop everything produced from the sources at or below `path`.
    /// Returns the number of output files deleted.
    fn remove_path(&mut self, path: &Path) -> Result<usize, BuildError> {
        if let Some(public) = self.public.as_ref().filter(|p| p.contains(path)) {
            public.remove(path)?;
            return Ok(0);
        }

        let sources = self.cache.sources_under(path);
        if sources.is_empty() {
            tracing::debug!("No cached outputs for {}", path.display());
        }

        let mut removed = 0;
        for source in sources {
            for output in self.cache.clear_outputs(&source) {
                if output.exists() {
                    fs::remove_file(&output).map_err(|e| BuildError::WriteError(e.to_string()))?;
                    removed += 1;
                }
            }
            self.cache.forget(&source);

            if let Ok(relative) = source.strip_prefix(&self.config.pages_dir) {
                let relative = relative.to_path_buf();
                if let Some(artifact) = self.staged.remove(&relative) {
                    if artifact.exists() {
                        fs::remove_file(&artifact)
                            .map_err(|e| BuildError::WriteError(e.to_string()))?;
                    }
                }
                self.pending.remove(&relative);
                if is_shell(&relative) {
                    self.shell_changed = true;
                }
            }

            tracing::debug!("Removed {}", source.display());
        }

        Ok(removed)
    }

    /// Compile `sources` in parallel and record what they import.
    fn compile(&mut self, sources: &BTreeSet<PathBuf>) -> Result<(), BuildError> {
        let compiler = self.compiler.as_ref();
        let pages_dir = &self.config.pages_dir;
        let staging_dir = &self.config.staging_dir;

        let results: Vec<Result<Compiled, BuildError>> = sources
            .par_iter()
            .map(|source| compile_source(compiler, pages_dir, staging_dir, source))
            .collect();

        let mut first_error = None;
        for result in results {
            match result {
                Ok(compiled) => {
                    self.cache
                        .record_dependencies(&compiled.source, compiled.dependencies);
                    if is_shell(&compiled.relative) {
                        self.shell_changed = true;
                    }
                    self.pending.insert(compiled.relative.clone());
                    self.staged.insert(compiled.relative, compiled.artifact);
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Artifact of the document shell or wrapper at the pages root.
    fn shell_artifact(&self, name: &str) -> Option<PathBuf> {
        self.staged
            .iter()
            .find(|(relative, _)| {
                relative.parent() == Some(Path::new("")) && file_stem(relative) == name
            })
            .map(|(_, artifact)| artifact.clone())
    }

    /// Render every route of the page staged at `relative`.
    fn render_page(
        &mut self,
        relative: &Path,
        document: &Node,
        wrapper: &Component,
    ) -> Result<Vec<RenderedRoute>, BuildError> {
        let source = self.config.pages_dir.join(relative);
        let Some(artifact) = self.staged.get(relative) else {
            return Ok(Vec::new());
        };

        let page = load_page(self.loader.as_ref(), artifact)?;

        let page_dir = relative.parent().unwrap_or(Path::new(""));
        let routes = resolve_routes(&page, page_dir, file_stem(relative)).map_err(|e| {
            PageError::MalformedPage {
                path: artifact.clone(),
                reason: e.to_string(),
            }
        })?;

        if routes.is_empty() {
            tracing::debug!("{} has no routes", relative.display());
        }

        let mut rendered = Vec::with_capacity(routes.len());
        for route in routes {
            let render_error = |source: RenderError| BuildError::Render {
                path: relative.to_path_buf(),
                source,
            };

            let (body, head) =
                render_route(&page, wrapper, &route, relative).map_err(render_error)?;

            self.head.record(head);
            let head = self.head.contents();
            self.head.reset();

            let mut document = document.clone();
            inject(&mut document, body, head)?;

            rendered.push(RenderedRoute {
                source: source.clone(),
                output: route.output_file(&self.config.output_dir),
                html: format!("{}{}", DOCTYPE, document),
            });
        }

        Ok(rendered)
    }

    /// Write the rendered routes, replacing the outputs previously attributed
    /// to the rendered pages.
    async fn persist(
        &mut self,
        render_set: &[PathBuf],
        rendered: Vec<RenderedRoute>,
        report: &mut BuildReport,
    ) -> Result<(), BuildError> {
        let fresh: BTreeSet<&Path> = rendered.iter().map(|r| r.output.as_path()).collect();

        for relative in render_set {
            let source = self.config.pages_dir.join(relative);
            for stale in self.cache.clear_outputs(&source) {
                if !fresh.contains(stale.as_path()) && stale.exists() {
                    tokio::fs::remove_file(&stale)
                        .await
                        .map_err(|e| BuildError::WriteError(e.to_string()))?;
                    report.removed += 1;
                }
            }
        }

        for route in rendered {
            if let Some(parent) = route.output.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| BuildError::WriteError(e.to_string()))?;
            }
            tokio::fs::write(&route.output, route.html)
                .await
                .map_err(|e| BuildError::WriteError(e.to_string()))?;

            self.cache.record_output(&route.source, route.output);
            report.routes += 1;
        }

        Ok(())
    }
}

fn compile_source(
    compiler: &dyn Compiler,
    pages_dir: &Path,
    staging_dir: &Path,
    source: &Path,
) -> Result<Compiled, BuildError> {
    let relative = source
        .strip_prefix(pages_dir)
        .unwrap_or(source)
        .to_path_buf();
    let artifact = compiler.artifact_path(staging_dir, &relative);

    compiler.compile(source, &artifact)?;

    let content = fs::read_to_string(source).map_err(|e| BuildError::ReadError {
        path: source.to_path_buf(),
        message: e.to_string(),
    })?;
    let extension = source.extension().and_then(|e| e.to_str()).unwrap_or("");
    let dependencies = local_dependencies(source, &content, extension);

    tracing::debug!("Compiled {}", relative.display());

    Ok(Compiled {
        source: source.to_path_buf(),
        relative,
        artifact,
        dependencies,
    })
}

/// Render one route through the wrapper. Returns the page content and the
/// head nodes it emitted.
///
/// The page, its head and the wrapper also receive the route context under
/// [`ROUTE_PROP`], replacing any prop of that name.
fn render_route(
    page: &Page,
    wrapper: &Component,
    route: &Route,
    relative: &Path,
) -> Result<(Node, Vec<Node>), RenderError> {
    let value = (page.props)(Some(&route.key))?;
    let context = route.context(relative);

    let mut page_props = Props::from_value(value.clone())?;
    page_props
        .values
        .insert(ROUTE_PROP.to_string(), context.clone());
    let mut cx = RenderContext::new();

    if let Some(head) = &page.head {
        let node = head.call(&mut cx, page_props.clone())?;
        cx.emit_head([node]);
    }

    let mut wrapper_props =
        Props::new().with_component("Component", page.render.bind(page_props));
    wrapper_props.values.insert("pageProps".to_string(), value);
    wrapper_props.values.insert(ROUTE_PROP.to_string(), context);

    let body = wrapper.call(&mut cx, wrapper_props)?;
    Ok((body, cx.take_head()))
}
