//! Element tree, render context and markup parsing for skiff.
//!
//! Pages render into a tree of [`Node`]s which is serialized to HTML with
//! `Display`. Components are plain closures wrapped in [`Component`] and are
//! invoked through [`create`], which is also the target of the markup parser's
//! component resolution.

pub mod component;
pub mod element;
pub mod head;
pub mod parse;

pub use component::{Component, Props};
pub use element::{
    attributes, create, style, AttrValue, Attributes, Child, Element, Kind, Node, Query,
    RenderError,
};
pub use head::{head_component, HeadContents, RenderContext};
pub use parse::{parse_markup, render_markup, Markup, Scope};
