//! Markup parser.
//!
//! Turns rendered HTML (for instance the output of a template) back into an
//! element tree. Capitalised tags such as `<Head>` are component references
//! and are resolved against a [`Scope`] when the parsed markup is rendered.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::component::{Component, Props};
use crate::element::{create, AttrValue, Attributes, Child, Kind, Node, RenderError};
use crate::head::{head_component, RenderContext};

/// Elements that never have children or a closing tag in source markup.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Standard HTML element names. A capitalised tag matching one of these
/// case-insensitively is an element unless the scope defines a component of
/// exactly that name.
const HTML_ELEMENTS: &[&str] = &[
    "a", "abbr", "address", "area", "article", "aside", "audio", "b", "base", "bdi", "bdo",
    "blockquote", "body", "br", "button", "canvas", "caption", "cite", "code", "col", "colgroup",
    "data", "datalist", "dd", "del", "details", "dfn", "dialog", "div", "dl", "dt", "em", "embed",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "head", "header", "hgroup", "hr", "html", "i", "iframe", "img", "input", "ins", "kbd",
    "label", "legend", "li", "link", "main", "map", "mark", "menu", "meta", "meter", "nav",
    "noscript", "object", "ol", "optgroup", "option", "output", "p", "picture", "pre",
    "progress", "q", "rp", "rt", "ruby", "s", "samp", "script", "search", "section", "select",
    "slot", "small", "source", "span", "strong", "style", "sub", "summary", "sup", "svg",
    "table", "tbody", "td", "template", "textarea", "tfoot", "th", "thead", "time", "title",
    "tr", "track", "u", "ul", "var", "video", "wbr",
];

/// Elements whose content is kept as raw text.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea"];

// Groups: 1 = closing tag name, 2 = opening tag name, 3 = attributes, 4 = self-closing slash.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<!--.*?-->|<![^>]*>|</\s*([A-Za-z][A-Za-z0-9:-]*)\s*>|<([A-Za-z][A-Za-z0-9:-]*)((?:\s+[^\s"'<>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)\s*(/?)>"#,
    )
    .expect("Invalid markup token regex")
});

static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("Invalid attribute regex")
});

/// Parsed markup, before components are resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Markup {
    Element {
        name: String,
        attributes: Attributes,
        children: Vec<Markup>,
    },
    Text(String),
}

/// Components available to capitalised tags.
#[derive(Debug, Clone)]
pub struct Scope {
    components: IndexMap<String, Component>,
}

impl Scope {
    /// A scope holding the built-in `Head` component.
    pub fn new() -> Self {
        let mut components = IndexMap::new();
        components.insert("Head".to_string(), head_component());
        Self { components }
    }

    /// Add a component, replacing any previous one of the same name.
    pub fn with(mut self, name: impl Into<String>, component: Component) -> Self {
        self.components.insert(name.into(), component);
        self
    }

    /// Add every callable prop of `props`.
    pub fn with_props(mut self, props: &Props) -> Self {
        for (name, component) in &props.components {
            self.components.insert(name.clone(), component.clone());
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Markup {
    /// Build the element tree, calling components for capitalised tags.
    ///
    /// Children are rendered before their parent, so a component receives
    /// fully built children.
    pub fn render(&self, cx: &mut RenderContext, scope: &Scope) -> Result<Node, RenderError> {
        match self {
            Markup::Text(text) => Ok(Node::Text(text.clone())),
            Markup::Element {
                name,
                attributes,
                children,
            } => {
                let children = children
                    .iter()
                    .map(|child| child.render(cx, scope).map(Child::from))
                    .collect::<Result<Vec<_>, _>>()?;

                create(cx, resolve_kind(name, scope)?, attributes.clone(), children)
            }
        }
    }
}

/// Capitalised names are components when the scope has them, otherwise
/// HTML elements written in upper case (`<P>`, `<DIV>`).
fn resolve_kind(name: &str, scope: &Scope) -> Result<Kind, RenderError> {
    if !name.starts_with(|c: char| c.is_ascii_uppercase()) {
        return Ok(Kind::Tag(name.to_string()));
    }
    if let Some(component) = scope.get(name) {
        return Ok(Kind::Component(component.clone()));
    }

    let lower = name.to_ascii_lowercase();
    if HTML_ELEMENTS.contains(&lower.as_str()) {
        Ok(Kind::Tag(lower))
    } else {
        Err(RenderError::UnknownComponent(name.to_string()))
    }
}

/// Parse and render markup in one step. Several top-level nodes are
/// returned as a fragment.
pub fn render_markup(
    source: &str,
    cx: &mut RenderContext,
    scope: &Scope,
) -> Result<Node, RenderError> {
    let mut nodes = parse_markup(source)
        .iter()
        .map(|markup| markup.render(cx, scope))
        .collect::<Result<Vec<_>, _>>()?;

    if nodes.len() == 1 {
        Ok(nodes.remove(0))
    } else {
        Ok(Node::Fragment(nodes))
    }
}

/// An element whose closing tag has not been seen yet.
struct Open {
    name: String,
    attributes: Attributes,
    children: Vec<Markup>,
}

impl Open {
    fn close(self) -> Markup {
        Markup::Element {
            name: self.name,
            attributes: self.attributes,
            children: self.children,
        }
    }
}

struct Builder {
    root: Vec<Markup>,
    stack: Vec<Open>,
}

impl Builder {
    fn append(&mut self, markup: Markup) {
        match self.stack.last_mut() {
            Some(open) => open.children.push(markup),
            None => self.root.push(markup),
        }
    }

    /// Append text, dropping whitespace-only runs that span lines (the
    /// indentation between tags) outside of `<pre>`.
    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let in_pre = self
            .stack
            .iter()
            .any(|open| open.name.eq_ignore_ascii_case("pre"));
        if !in_pre && text.trim().is_empty() && text.contains('\n') {
            return;
        }
        self.append(Markup::Text(text.to_string()));
    }

    /// Close the innermost open element named `name`, implicitly closing any
    /// element opened after it. Stray closing tags are ignored.
    fn close(&mut self, name: &str) {
        let Some(index) = self
            .stack
            .iter()
            .rposition(|open| open.name.eq_ignore_ascii_case(name))
        else {
            return;
        };
        while self.stack.len() > index {
            if let Some(open) = self.stack.pop() {
                let markup = open.close();
                self.append(markup);
            }
        }
    }

    fn finish(mut self) -> Vec<Markup> {
        while let Some(open) = self.stack.pop() {
            let markup = open.close();
            self.append(markup);
        }
        self.root
    }
}

/// Parse markup into a tree. Unclosed elements are closed at the end of the
/// input; comments and doctypes are kept as text.
pub fn parse_markup(source: &str) -> Vec<Markup> {
    let mut builder = Builder {
        root: Vec::new(),
        stack: Vec::new(),
    };
    let mut pos = 0;

    while let Some(caps) = TOKEN_RE.captures_at(source, pos) {
        let Some(token) = caps.get(0) else {
            break;
        };
        builder.text(&source[pos..token.start()]);
        pos = token.end();

        if let Some(close) = caps.get(1) {
            builder.close(close.as_str());
            continue;
        }

        let Some(name) = caps.get(2).map(|m| m.as_str()) else {
            builder.append(Markup::Text(token.as_str().to_string()));
            continue;
        };

        let attributes = parse_attributes(caps.get(3).map_or("", |m| m.as_str()));
        let self_closing = caps.get(4).is_some_and(|m| !m.as_str().is_empty())
            || VOID_ELEMENTS.contains(&name.to_ascii_lowercase().as_str());

        if self_closing {
            builder.append(Markup::Element {
                name: name.to_string(),
                attributes,
                children: Vec::new(),
            });
        } else if RAW_TEXT_ELEMENTS.contains(&name.to_ascii_lowercase().as_str()) {
            let closing = format!("</{}", name.to_ascii_lowercase());
            let end = source[pos..]
                .to_ascii_lowercase()
                .find(&closing)
                .map_or(source.len(), |i| pos + i);

            let children = if end > pos {
                vec![Markup::Text(source[pos..end].to_string())]
            } else {
                Vec::new()
            };
            builder.append(Markup::Element {
                name: name.to_string(),
                attributes,
                children,
            });

            pos = source[end..].find('>').map_or(source.len(), |i| end + i + 1);
        } else {
            builder.stack.push(Open {
                name: name.to_string(),
                attributes,
                children: Vec::new(),
            });
        }
    }

    builder.text(&source[pos..]);
    builder.finish()
}

fn parse_attributes(source: &str) -> Attributes {
    let mut attributes = Attributes::new();

    for caps in ATTRIBUTE_RE.captures_iter(source) {
        let Some(name) = caps.get(1) else {
            continue;
        };
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or("", |m| m.as_str());

        attributes.insert(name.as_str().to_string(), AttrValue::from(value));
    }

    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn roundtrip(source: &str) -> String {
        let mut cx = RenderContext::new();
        render_markup(source, &mut cx, &Scope::new())
            .unwrap()
            .to_string()
    }

    #[test]
    fn parses_nested_elements_and_attributes() {
        let html = roundtrip(r#"<div class="a" data-x='1' hidden><p>Hi <b>there</b></p></div>"#);

        assert_eq!(
            html,
            r#"<div class="a" data-x="1" hidden=""><p>Hi <b>there</b></p></div>"#
        );
    }

    #[test]
    fn closes_void_and_self_closing_elements() {
        let html = roundtrip(r#"<head><meta charset="utf-8"><link rel="icon" href="/i.png" /></head>"#);

        assert_eq!(
            html,
            r#"<head><meta charset="utf-8"></meta><link rel="icon" href="/i.png"></link></head>"#
        );
    }

    #[test]
    fn keeps_script_content_raw() {
        let html = roundtrip("<script>if (a < b) { go('<p>') }</script>");

        assert_eq!(html, "<script>if (a < b) { go('<p>') }</script>");
    }

    #[test]
    fn drops_indentation_between_tags() {
        let html = roundtrip("<ul>\n  <li>one</li>\n  <li>two</li>\n</ul>");

        assert_eq!(html, "<ul><li>one</li><li>two</li></ul>");
    }

    #[test]
    fn keeps_comments_and_tolerates_unclosed_tags() {
        let html = roundtrip("<!-- note --><div><p>open");

        assert_eq!(html, "<!-- note --><div><p>open</p></div>");
    }

    #[test]
    fn class_name_attribute_merges_on_output() {
        let html = roundtrip(r#"<div class="card" className="wide"></div>"#);

        assert_eq!(html, r#"<div class="cardwide"></div>"#);
    }

    #[test]
    fn resolves_head_component() {
        let mut cx = RenderContext::new();

        let node = render_markup(
            "<Head><title>Post</title></Head><h1>Post</h1>",
            &mut cx,
            &Scope::new(),
        )
        .unwrap();

        assert_eq!(node.to_string(), "<h1>Post</h1>");
        let head: String = cx.head().iter().map(Node::to_string).collect();
        assert_eq!(head, "<title>Post</title>");
    }

    #[test]
    fn resolves_scoped_components() {
        let shout = Component::new("Shout", |_, props| {
            let text: String = props.children.iter().map(Node::to_string).collect();
            Ok(Node::text(text.to_uppercase()))
        });
        let scope = Scope::new().with("Shout", shout);
        let mut cx = RenderContext::new();

        let node = render_markup("<p><Shout>hey</Shout></p>", &mut cx, &scope).unwrap();

        assert_eq!(node.to_string(), "<p>HEY</p>");
    }

    #[test]
    fn upper_case_html_tags_are_elements() {
        let html = roundtrip("<DIV><P>hi</p></DIV><HEAD></HEAD>");

        assert_eq!(html, "<div><p>hi</p></div><head></head>");
    }

    #[test]
    fn single_quoted_values_keep_double_quotes_escaped() {
        let html = roundtrip(r#"<a title='say "hi"' href="/">x</a>"#);

        assert_eq!(html, r#"<a title="say &quot;hi&quot;" href="/">x</a>"#);
    }

    #[test]
    fn unknown_component_is_an_error() {
        let mut cx = RenderContext::new();

        let result = render_markup("<Missing />", &mut cx, &Scope::new());

        assert!(matches!(result, Err(RenderError::UnknownComponent(name)) if name == "Missing"));
    }
}
