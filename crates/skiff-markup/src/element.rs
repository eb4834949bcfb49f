//! The element tree: tag nodes, fragments and text.

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::component::{Component, Props};
use crate::head::RenderContext;

/// Ordered attribute mapping of an element.
pub type Attributes = IndexMap<String, AttrValue>;

/// Attributes whose value replaces the serialized children of an element.
const RAW_HTML_ATTRIBUTES: [&str; 2] = ["html", "dangerouslySetInnerHTML"];

static TAG_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9:-]*$").expect("Invalid tag name regex"));

/// Errors raised while building or rendering a tree.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Invalid tag name: {0:?}")]
    InvalidTag(String),

    #[error("Unknown component: <{0}>")]
    UnknownComponent(String),

    #[error("Props must be an object, got {0}")]
    InvalidProps(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("{0}")]
    Hook(String),
}

/// An attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Plain value, emitted as-is
    Text(String),

    /// Structured inline style, emitted as `key: value;` declarations
    Style(IndexMap<String, String>),
}

impl AttrValue {
    /// Get the value if it is plain text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(text) => Some(text),
            AttrValue::Style(_) => None,
        }
    }

    /// The serialized form of the value.
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            AttrValue::Text(text) => Cow::Borrowed(text),
            AttrValue::Style(declarations) => Cow::Owned(style_to_string(declarations)),
        }
    }

    /// The value as it is handed to a component through its props.
    pub fn to_json(&self) -> Value {
        match self {
            AttrValue::Text(text) => Value::String(text.clone()),
            AttrValue::Style(declarations) => Value::Object(
                declarations
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

/// Build an attribute mapping from name/value pairs, keeping their order.
pub fn attributes<I, K, V>(pairs: I) -> Attributes
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<AttrValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Build a structured style value from camelCase property/value pairs.
pub fn style<I, K, V>(declarations: I) -> AttrValue
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    AttrValue::Style(
        declarations
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect(),
    )
}

/// Convert `backgroundColor` into `background-color`.
fn kebab_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn style_to_string(declarations: &IndexMap<String, String>) -> String {
    declarations
        .iter()
        .map(|(key, value)| format!("{}: {};", kebab_case(key), value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A node of the element tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A tag with attributes and children
    Element(Element),

    /// Children without any wrapping markup
    Fragment(Vec<Node>),

    /// Literal text, serialized verbatim
    Text(String),
}

impl Node {
    /// Create a text node.
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    /// An empty fragment, which serializes to nothing.
    pub fn empty() -> Self {
        Node::Fragment(Vec::new())
    }

    /// Find the first element matching `query` in pre-order.
    pub fn find(&self, query: &Query<'_>) -> Option<&Element> {
        match self {
            Node::Element(element) => element.find(query),
            Node::Fragment(children) => children.iter().find_map(|c| c.find(query)),
            Node::Text(_) => None,
        }
    }

    /// Mutable counterpart of [`Node::find`].
    pub fn find_mut(&mut self, query: &Query<'_>) -> Option<&mut Element> {
        match self {
            Node::Element(element) => element.find_mut(query),
            Node::Fragment(children) => children.iter_mut().find_map(|c| c.find_mut(query)),
            Node::Text(_) => None,
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Element(element) => fmt::Display::fmt(element, f),
            Node::Fragment(children) => children.iter().try_for_each(|c| fmt::Display::fmt(c, f)),
            Node::Text(text) => f.write_str(text),
        }
    }
}

/// A child handed to an element constructor.
///
/// Lists stand for several siblings passed where one child was expected.
/// They never survive construction: [`Child::into_node`] turns them into
/// fragments.
#[derive(Debug, Clone)]
pub enum Child {
    Node(Node),
    List(Vec<Child>),
}

impl Child {
    /// Resolve into a node, wrapping lists in an implicit fragment.
    pub fn into_node(self) -> Node {
        match self {
            Child::Node(node) => node,
            Child::List(items) => Node::Fragment(items.into_iter().map(Child::into_node).collect()),
        }
    }
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Child::Node(node)
    }
}

impl From<Element> for Child {
    fn from(element: Element) -> Self {
        Child::Node(Node::Element(element))
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Node(Node::text(text))
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Node(Node::Text(text))
    }
}

impl<T: Into<Child>> From<Vec<T>> for Child {
    fn from(items: Vec<T>) -> Self {
        Child::List(items.into_iter().map(Into::into).collect())
    }
}

/// Lookup criteria for [`Node::find`]: an element matches when either its
/// `id` attribute or its tag name matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct Query<'a> {
    pub id: Option<&'a str>,
    pub tag: Option<&'a str>,
}

impl<'a> Query<'a> {
    /// Match on the `id` attribute.
    pub fn id(id: &'a str) -> Self {
        Self {
            id: Some(id),
            tag: None,
        }
    }

    /// Match on the tag name.
    pub fn tag(tag: &'a str) -> Self {
        Self {
            id: None,
            tag: Some(tag),
        }
    }
}

/// A tag node.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    tag: String,
    pub attributes: Attributes,
    pub children: Vec<Node>,
}

impl Element {
    /// Create an element, flattening nested child lists into fragments.
    pub fn new(
        tag: impl Into<String>,
        attributes: Attributes,
        children: Vec<Child>,
    ) -> Result<Self, RenderError> {
        Self::with_nodes(
            tag.into(),
            attributes,
            children.into_iter().map(Child::into_node).collect(),
        )
    }

    fn with_nodes(
        tag: String,
        attributes: Attributes,
        children: Vec<Node>,
    ) -> Result<Self, RenderError> {
        if !TAG_NAME_RE.is_match(&tag) {
            return Err(RenderError::InvalidTag(tag));
        }

        Ok(Self {
            tag,
            attributes,
            children,
        })
    }

    /// The tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    fn matches(&self, query: &Query<'_>) -> bool {
        let id_matches = query.id.is_some_and(|id| {
            self.attribute("id")
                .and_then(AttrValue::as_text)
                .is_some_and(|value| value == id)
        });

        id_matches || query.tag.is_some_and(|tag| self.tag == tag)
    }

    /// Find this element or the first matching descendant.
    pub fn find(&self, query: &Query<'_>) -> Option<&Element> {
        if self.matches(query) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(query))
    }

    /// Mutable counterpart of [`Element::find`].
    pub fn find_mut(&mut self, query: &Query<'_>) -> Option<&mut Element> {
        if self.matches(query) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(query))
    }

    /// Attributes as they are serialized, plus the raw HTML replacing the
    /// children if one of the raw HTML attributes is set.
    fn serialized_attributes(&self) -> (Vec<(&str, Cow<'_, str>)>, Option<Cow<'_, str>>) {
        let mut merged_class = match (self.attribute("class"), self.attribute("className")) {
            (Some(class), Some(class_name)) => {
                Some(format!("{}{}", class.render(), class_name.render()))
            }
            _ => None,
        };
        let has_class = self.attributes.contains_key("class");

        let mut out = Vec::with_capacity(self.attributes.len());
        let mut raw_html = None;

        for (name, value) in &self.attributes {
            match name.as_str() {
                n if RAW_HTML_ATTRIBUTES.contains(&n) => {
                    let html = value.render();
                    if raw_html.is_none() && !html.is_empty() {
                        raw_html = Some(html);
                    }
                }
                "className" if has_class => {}
                "className" => out.push(("class", value.render())),
                "class" => {
                    let class = merged_class
                        .take()
                        .map(Cow::Owned)
                        .unwrap_or_else(|| value.render());
                    out.push(("class", class));
                }
                _ => out.push((name.as_str(), value.render())),
            }
        }

        (out, raw_html)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (attributes, raw_html) = self.serialized_attributes();

        write!(f, "<{}", self.tag)?;
        for (name, value) in attributes {
            write!(f, " {}=\"{}\"", name, value.replace('"', "&quot;"))?;
        }
        f.write_str(">")?;

        match raw_html {
            Some(html) => f.write_str(&html)?,
            None => self
                .children
                .iter()
                .try_for_each(|c| fmt::Display::fmt(c, f))?,
        }

        write!(f, "</{}>", self.tag)
    }
}

/// What [`create`] builds: a tag, a fragment, or a component call.
#[derive(Debug, Clone)]
pub enum Kind {
    Tag(String),
    Fragment,
    Component(Component),
}

impl From<&str> for Kind {
    fn from(tag: &str) -> Self {
        Kind::Tag(tag.to_string())
    }
}

impl From<String> for Kind {
    fn from(tag: String) -> Self {
        Kind::Tag(tag)
    }
}

impl From<Component> for Kind {
    fn from(component: Component) -> Self {
        Kind::Component(component)
    }
}

/// Build a node.
///
/// Components are called with the attributes as props and the flattened
/// children as `children`; whatever they return is handed back unchanged.
pub fn create(
    cx: &mut RenderContext,
    kind: impl Into<Kind>,
    attributes: Attributes,
    children: Vec<Child>,
) -> Result<Node, RenderError> {
    let children: Vec<Node> = children.into_iter().map(Child::into_node).collect();

    match kind.into() {
        Kind::Tag(tag) => Ok(Node::Element(Element::with_nodes(tag, attributes, children)?)),
        Kind::Fragment => Ok(Node::Fragment(children)),
        Kind::Component(component) => {
            component.call(cx, Props::from_attributes(attributes, children))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn el(tag: &str, attrs: Attributes, children: Vec<Child>) -> Node {
        Node::Element(Element::new(tag, attrs, children).unwrap())
    }

    #[test]
    fn serializes_nested_elements() {
        let node = el(
            "div",
            attributes([("id", "main")]),
            vec![el("p", Attributes::new(), vec!["Hello".into()]).into()],
        );

        assert_eq!(node.to_string(), r#"<div id="main"><p>Hello</p></div>"#);
    }

    #[test]
    fn always_emits_closing_tag() {
        let node = el("meta", attributes([("charset", "utf-8")]), vec![]);

        assert_eq!(node.to_string(), r#"<meta charset="utf-8"></meta>"#);
    }

    #[test]
    fn merges_class_name_into_class() {
        let node = el(
            "div",
            attributes([("class", "card"), ("id", "x"), ("className", "wide")]),
            vec![],
        );
        let html = node.to_string();

        assert_eq!(html, r#"<div class="cardwide" id="x"></div>"#);
        assert_eq!(html.matches("class=").count(), 1);
        assert!(!html.contains("className"));
    }

    #[test]
    fn escapes_quotes_in_attribute_values() {
        let node = el("div", attributes([("title", r#"say "hi""#)]), vec![]);

        assert_eq!(node.to_string(), r#"<div title="say &quot;hi&quot;"></div>"#);
    }

    #[test]
    fn renames_lone_class_name() {
        let node = el("span", attributes([("className", "tag")]), vec![]);

        assert_eq!(node.to_string(), r#"<span class="tag"></span>"#);
    }

    #[test]
    fn serializes_style_mapping() {
        let mut attrs = Attributes::new();
        attrs.insert(
            "style".to_string(),
            style([("color", "red"), ("backgroundColor", "blue")]),
        );
        let node = el("div", attrs, vec![]);

        assert_eq!(
            node.to_string(),
            r#"<div style="color: red; background-color: blue;"></div>"#
        );
    }

    #[test]
    fn keeps_string_style_verbatim() {
        let node = el(
            "div",
            attributes([("style", "color: red;")]),
            vec![el("p", Attributes::new(), vec!["Hello there!".into()]).into()],
        );

        assert_eq!(
            node.to_string(),
            r#"<div style="color: red;"><p>Hello there!</p></div>"#
        );
    }

    #[test]
    fn raw_html_replaces_children() {
        let node = el(
            "div",
            attributes([("html", "<p>Hello there!</p><h3>This is pretty neat!</h3>")]),
            vec!["ignored".into()],
        );

        assert_eq!(
            node.to_string(),
            "<div><p>Hello there!</p><h3>This is pretty neat!</h3></div>"
        );
    }

    #[test]
    fn nested_lists_serialize_like_fragments() {
        let mut cx = RenderContext::new();
        let a = || el("b", Attributes::new(), vec!["a".into()]);
        let b = || Node::text("b");

        let from_list = create(
            &mut cx,
            "div",
            Attributes::new(),
            vec![vec![a(), b()].into()],
        )
        .unwrap();
        let fragment = create(
            &mut cx,
            Kind::Fragment,
            Attributes::new(),
            vec![a().into(), b().into()],
        )
        .unwrap();
        let from_fragment = create(&mut cx, "div", Attributes::new(), vec![fragment.into()]).unwrap();

        assert_eq!(from_list.to_string(), from_fragment.to_string());
        assert_eq!(from_list, from_fragment);
        let Node::Element(div) = from_list else {
            panic!("expected element");
        };
        assert!(matches!(div.children.as_slice(), [Node::Fragment(_)]));
    }

    #[test]
    fn fragment_concatenates_children() {
        let node = Node::Fragment(vec![
            el("p", Attributes::new(), vec!["1".into()]),
            Node::text("2"),
        ]);

        assert_eq!(node.to_string(), "<p>1</p>2");
    }

    #[test]
    fn delegates_to_components() {
        let mut cx = RenderContext::new();
        let greeting = Component::new("Greeting", |cx, props| {
            let name = props.get("name").and_then(|v| v.as_str()).unwrap_or("?");
            let mut children: Vec<Child> = vec![format!("Hello {}", name).into()];
            children.extend(props.children.into_iter().map(Child::from));
            create(cx, "h1", Attributes::new(), children)
        });

        let node = create(
            &mut cx,
            greeting,
            attributes([("name", "skiff")]),
            vec!["!".into()],
        )
        .unwrap();

        assert_eq!(node.to_string(), "<h1>Hello skiff!</h1>");
    }

    #[test]
    fn rejects_invalid_tag_names() {
        let result = Element::new("not a tag", Attributes::new(), vec![]);

        assert!(matches!(result, Err(RenderError::InvalidTag(_))));
    }

    #[test]
    fn finds_by_id_before_later_tags() {
        let doc = el(
            "html",
            Attributes::new(),
            vec![
                el("head", Attributes::new(), vec![]).into(),
                el(
                    "body",
                    Attributes::new(),
                    vec![el("div", attributes([("id", "skiff")]), vec![]).into()],
                )
                .into(),
            ],
        );

        assert_eq!(doc.find(&Query::id("skiff")).unwrap().tag(), "div");
        assert_eq!(doc.find(&Query::tag("body")).unwrap().tag(), "body");
        assert!(doc.find(&Query::id("missing")).is_none());
    }

    #[test]
    fn find_descends_into_fragments_but_not_text() {
        let mut doc = Node::Fragment(vec![
            Node::text("<head></head>"),
            Node::Fragment(vec![el("head", Attributes::new(), vec![])]),
        ]);

        let head = doc.find_mut(&Query::tag("head")).unwrap();
        head.children.push(Node::text("<title>t</title>"));

        assert_eq!(doc.to_string(), "<head></head><head><title>t</title></head>");
    }
}
