//! Head metadata collection.
//!
//! A page can register metadata for the document head from anywhere in its
//! render tree through the [`head_component`]. Nodes are collected in the
//! [`RenderContext`] of the current render; the builder moves them into
//! [`HeadContents`] once the page has rendered and resets it after the page
//! is written.

use crate::component::Component;
use crate::element::Node;

/// State threaded through every component call of a single render.
#[derive(Debug, Default)]
pub struct RenderContext {
    head: Vec<Node>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register nodes destined for the document head.
    pub fn emit_head(&mut self, nodes: impl IntoIterator<Item = Node>) {
        self.head.extend(nodes);
    }

    /// Head nodes emitted so far.
    pub fn head(&self) -> &[Node] {
        &self.head
    }

    /// Drain the emitted head nodes.
    pub fn take_head(&mut self) -> Vec<Node> {
        std::mem::take(&mut self.head)
    }
}

/// The `Head` component: records its children as head contents and renders
/// nothing where it is used.
pub fn head_component() -> Component {
    Component::new("Head", |cx, props| {
        cx.emit_head(props.children);
        Ok(Node::empty())
    })
}

/// Aggregated head contents: a static part injected once and a per-render
/// part that is reset after every page.
#[derive(Debug, Clone, Default)]
pub struct HeadContents {
    static_nodes: Vec<Node>,
    rendered: Vec<Node>,
}

impl HeadContents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add nodes included in every page's head.
    pub fn inject_static(&mut self, nodes: impl IntoIterator<Item = Node>) {
        self.static_nodes.extend(nodes);
    }

    /// Record the head nodes of the page being rendered.
    pub fn record(&mut self, nodes: impl IntoIterator<Item = Node>) {
        self.rendered.extend(nodes);
    }

    /// Static contents followed by the current page's contents.
    pub fn contents(&self) -> Vec<Node> {
        self.static_nodes
            .iter()
            .chain(self.rendered.iter())
            .cloned()
            .collect()
    }

    /// Clear the per-render part. The static part is kept.
    pub fn reset(&mut self) {
        self.rendered.clear();
    }
}
