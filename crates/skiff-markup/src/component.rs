//! Components and the props they are called with.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::element::{Attributes, Node, RenderError};
use crate::head::RenderContext;

type RenderFn = dyn Fn(&mut RenderContext, Props) -> Result<Node, RenderError> + Send + Sync;

/// A callable component: `(context, props) -> node`.
#[derive(Clone)]
pub struct Component {
    name: Arc<str>,
    render: Arc<RenderFn>,
}

impl Component {
    /// Wrap a render function.
    pub fn new<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&mut RenderContext, Props) -> Result<Node, RenderError> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.into()),
            render: Arc::new(render),
        }
    }

    /// Name used in logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render the component.
    pub fn call(&self, cx: &mut RenderContext, props: Props) -> Result<Node, RenderError> {
        (self.render)(cx, props)
    }

    /// A component that renders `self` with `props` merged under whatever
    /// props it is eventually called with.
    pub fn bind(&self, props: Props) -> Component {
        let inner = self.clone();
        Component::new(self.name.to_string(), move |cx, extra| {
            let mut merged = props.clone();
            merged.merge(extra);
            inner.call(cx, merged)
        })
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.name).finish()
    }
}

/// Props handed to a component.
///
/// `values` carries plain data, `components` carries callable props such as
/// the page component handed to a wrapper.
#[derive(Clone, Default)]
pub struct Props {
    pub values: Map<String, Value>,
    pub children: Vec<Node>,
    pub components: IndexMap<String, Component>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Props from a data value. `null` yields empty props; anything other
    /// than an object is rejected.
    pub fn from_value(value: Value) -> Result<Self, RenderError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(values) => Ok(Self {
                values,
                ..Self::default()
            }),
            other => Err(RenderError::InvalidProps(other.to_string())),
        }
    }

    /// Props built from element attributes, as done when a component is
    /// created like a tag.
    pub fn from_attributes(attributes: Attributes, children: Vec<Node>) -> Self {
        Self {
            values: attributes
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
            children,
            components: IndexMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Add a callable prop.
    pub fn with_component(mut self, name: impl Into<String>, component: Component) -> Self {
        self.components.insert(name.into(), component);
        self
    }

    /// Merge `other` over `self`. Children are replaced only when `other`
    /// has some.
    pub fn merge(&mut self, other: Props) {
        self.values.extend(other.values);
        self.components.extend(other.components);
        if !other.children.is_empty() {
            self.children = other.children;
        }
    }

    /// The data part of the props as one JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("values", &self.values)
            .field("children", &self.children.len())
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::attributes;
    use serde_json::json;

    #[test]
    fn rejects_non_object_props() {
        assert!(Props::from_value(json!({ "a": 1 })).is_ok());
        assert!(Props::from_value(Value::Null).unwrap().values.is_empty());
        assert!(matches!(
            Props::from_value(json!([1, 2])),
            Err(RenderError::InvalidProps(_))
        ));
    }

    #[test]
    fn converts_attributes_to_values() {
        let props = Props::from_attributes(attributes([("title", "Hi")]), vec![Node::text("x")]);

        assert_eq!(props.get("title"), Some(&json!("Hi")));
        assert_eq!(props.children.len(), 1);
    }

    #[test]
    fn bound_props_are_overridden_by_call_props() {
        let echo = Component::new("Echo", |_, props| {
            Ok(Node::text(format!(
                "{}/{}",
                props.get("a").and_then(Value::as_str).unwrap_or("-"),
                props.get("b").and_then(Value::as_str).unwrap_or("-"),
            )))
        });
        let bound = echo.bind(Props::from_value(json!({ "a": "1", "b": "2" })).unwrap());

        let mut cx = RenderContext::new();
        let node = bound
            .call(&mut cx, Props::from_value(json!({ "b": "3" })).unwrap())
            .unwrap();

        assert_eq!(node.to_string(), "1/3");
    }
}
