//! Document shell and wrapper resolution.

use std::path::Path;

use skiff_markup::{
    attributes, Attributes, Component, Element, Node, Props, Query, RenderContext, RenderError,
};
use skiff_modules::{load_component, ModuleLoader, PageError};

/// Module holding a custom document shell.
pub const DOCUMENT_MODULE: &str = "_document";

/// Module holding a custom wrapper.
pub const APP_MODULE: &str = "_app";

/// `id` of the element receiving page content. The first `body` is used
/// when no element carries it.
pub const ENTRY_ID: &str = "skiff";

/// Errors raised while resolving the document shell or the wrapper.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error(transparent)]
    Malformed(#[from] PageError),

    #[error("Failed to render {module}: {source}")]
    Render {
        module: &'static str,
        source: RenderError,
    },

    #[error("Invalid document, no entry point found.")]
    MissingEntry,

    #[error("Invalid document, no head found.")]
    MissingHead,
}

/// `<html lang="en"><head><meta charset="utf-8"></head><body></body></html>`
pub fn default_document() -> Node {
    let build = || -> Result<Element, RenderError> {
        let meta = Element::new("meta", attributes([("charset", "utf-8")]), vec![])?;
        let head = Element::new("head", Attributes::new(), vec![meta.into()])?;
        let body = Element::new("body", Attributes::new(), vec![])?;
        Element::new(
            "html",
            attributes([("lang", "en")]),
            vec![head.into(), body.into()],
        )
    };

    build().map(Node::from).expect("Invalid default document")
}

/// The pass-through wrapper: renders the `Component` prop on its own.
pub fn default_wrapper() -> Component {
    Component::new("DefaultWrapper", |cx, props| {
        let page = props.components.get("Component").cloned().ok_or_else(|| {
            RenderError::InvalidProps("wrapper rendered without a `Component` prop".to_string())
        })?;
        page.call(cx, Props::new())
    })
}

/// Render the document shell compiled to `artifact`, or the default document
/// when there is none.
pub fn resolve_document(
    loader: &dyn ModuleLoader,
    artifact: Option<&Path>,
) -> Result<Node, DocumentError> {
    let Some(artifact) = artifact else {
        return Ok(default_document());
    };

    match load_component(loader, artifact)? {
        Some(document) => {
            tracing::debug!("Using custom document {}", artifact.display());
            document
                .call(&mut RenderContext::new(), Props::new())
                .map_err(|source| DocumentError::Render {
                    module: DOCUMENT_MODULE,
                    source,
                })
        }
        None => Ok(default_document()),
    }
}

/// Load the wrapper compiled to `artifact`, or the default wrapper when
/// there is none.
pub fn resolve_wrapper(
    loader: &dyn ModuleLoader,
    artifact: Option<&Path>,
) -> Result<Component, DocumentError> {
    let Some(artifact) = artifact else {
        return Ok(default_wrapper());
    };

    Ok(load_component(loader, artifact)?.unwrap_or_else(default_wrapper))
}

/// Check that `document` has both anchors.
pub fn check_anchors(document: &Node) -> Result<(), DocumentError> {
    if document.find(&Query::id(ENTRY_ID)).is_none() && document.find(&Query::tag("body")).is_none()
    {
        return Err(DocumentError::MissingEntry);
    }
    if document.find(&Query::tag("head")).is_none() {
        return Err(DocumentError::MissingHead);
    }
    Ok(())
}

/// Place `content` in the entry anchor of `document` and append `head` to
/// its head anchor.
pub fn inject(document: &mut Node, content: Node, head: Vec<Node>) -> Result<(), DocumentError> {
    let entry = if document.find(&Query::id(ENTRY_ID)).is_some() {
        document.find_mut(&Query::id(ENTRY_ID))
    } else {
        document.find_mut(&Query::tag("body"))
    };
    entry.ok_or(DocumentError::MissingEntry)?.children = vec![content];

    document
        .find_mut(&Query::tag("head"))
        .ok_or(DocumentError::MissingHead)?
        .children
        .extend(head);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use skiff_markup::{render_markup, Scope};
    use skiff_modules::{Export, LoadError, Module};
    use std::collections::HashMap;
    use std::path::PathBuf;

    struct FixedLoader(HashMap<PathBuf, Module>);

    impl ModuleLoader for FixedLoader {
        fn load(&self, artifact: &Path) -> Result<Module, LoadError> {
            self.0
                .get(artifact)
                .cloned()
                .ok_or_else(|| LoadError::NotFound(artifact.to_path_buf()))
        }
    }

    fn markup_component(source: &'static str) -> Component {
        Component::new("Markup", move |cx, props| {
            render_markup(source, cx, &Scope::new().with_props(&props))
        })
    }

    #[test]
    fn default_document_shape() {
        assert_eq!(
            default_document().to_string(),
            "<html lang=\"en\"><head><meta charset=\"utf-8\"></meta></head><body></body></html>"
        );
    }

    #[test]
    fn missing_modules_fall_back_to_defaults() {
        let loader = FixedLoader(HashMap::new());

        let document = resolve_document(&loader, Some(Path::new("_document.html.json"))).unwrap();
        assert_eq!(document, default_document());

        let wrapper = resolve_wrapper(&loader, None).unwrap();
        assert_eq!(wrapper.name(), "DefaultWrapper");
    }

    #[test]
    fn custom_document_is_rendered() {
        let loader = FixedLoader(HashMap::from([(
            PathBuf::from("doc"),
            Module::new().with(
                "default",
                Export::Component(markup_component(
                    "<html><head></head><body><div id=\"skiff\"></div></body></html>",
                )),
            ),
        )]));

        let mut document = resolve_document(&loader, Some(Path::new("doc"))).unwrap();
        inject(&mut document, Node::text("page"), vec![Node::text("meta")]).unwrap();

        assert_eq!(
            document.to_string(),
            "<html><head>meta</head><body><div id=\"skiff\">page</div></body></html>"
        );
    }

    #[test]
    fn malformed_document_names_the_file() {
        let loader = FixedLoader(HashMap::from([(
            PathBuf::from("pages/_document.html.json"),
            Module::new().with("default", Export::Value(serde_json::json!(1))),
        )]));

        let err = resolve_document(&loader, Some(Path::new("pages/_document.html.json")))
            .unwrap_err();

        assert!(err.to_string().contains("pages/_document.html.json"));
    }

    #[test]
    fn default_wrapper_renders_the_bound_page() {
        let page = Component::new("Page", |_, props| {
            Ok(Node::text(
                props.get("title").and_then(|t| t.as_str()).unwrap_or("-").to_string(),
            ))
        });
        let page_props = Props::from_value(serde_json::json!({ "title": "Hi" })).unwrap();
        let props = Props::new().with_component("Component", page.bind(page_props));

        let node = default_wrapper().call(&mut RenderContext::new(), props).unwrap();

        assert_eq!(node.to_string(), "Hi");
    }

    #[test]
    fn anchors_are_required() {
        let no_head = render_markup(
            "<html><body></body></html>",
            &mut RenderContext::new(),
            &Scope::new(),
        )
        .unwrap();
        let no_entry = render_markup(
            "<html><head></head></html>",
            &mut RenderContext::new(),
            &Scope::new(),
        )
        .unwrap();

        assert!(matches!(check_anchors(&no_head), Err(DocumentError::MissingHead)));
        assert!(matches!(check_anchors(&no_entry), Err(DocumentError::MissingEntry)));
        assert!(check_anchors(&default_document()).is_ok());
    }
}
