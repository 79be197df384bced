//! Views - what a component's view function returns.
//!
//! A [`View`] is a plain description: host primitives, text, and
//! placeholders for child components. The element builder is handed to the
//! view function as an explicit argument; `component()` is where child
//! nodes are looked up or created.

pub mod host;

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::engine::{Definition, NodeCore, Tree};
use crate::error::Result;
use crate::types::{NodeId, Props};

pub use host::Host;

#[derive(Clone, Debug, PartialEq)]
pub enum View {
    Empty,
    Text(String),
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
        children: Vec<View>,
    },
    /// A child node, rendered by the host in place.
    Component { node: NodeId },
}

impl View {
    pub fn element(tag: impl Into<String>) -> Self {
        View::Element {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        View::Text(content.into())
    }

    /// Set an attribute. No effect on non-element views.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let View::Element { attrs, .. } = &mut self {
            attrs.insert(name.into(), value.into());
        }
        self
    }

    /// Append a class to the `class` attribute.
    pub fn class(mut self, class: &str) -> Self {
        if let View::Element { attrs, .. } = &mut self {
            let classes = attrs.entry("class".to_string()).or_default();
            if !classes.is_empty() {
                classes.push(' ');
            }
            classes.push_str(class);
        }
        self
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    pub fn child(mut self, child: View) -> Self {
        if let View::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    pub fn children(mut self, more: impl IntoIterator<Item = View>) -> Self {
        if let View::Element { children, .. } = &mut self {
            children.extend(more);
        }
        self
    }
}

/// Passed to a definition's view function.
pub struct ElementBuilder<'a> {
    tree: &'a Tree,
    parent: Rc<NodeCore>,
}

impl<'a> ElementBuilder<'a> {
    pub(crate) fn new(tree: &'a Tree, parent: Rc<NodeCore>) -> Self {
        Self { tree, parent }
    }

    /// A host primitive.
    pub fn element(&self, tag: &str) -> View {
        View::element(tag)
    }

    pub fn text(&self, content: impl Into<String>) -> View {
        View::text(content)
    }

    /// A child component.
    ///
    /// Reuses the existing child for (definition, key) and hands it the new
    /// props, or creates one. Fails with `DuplicateKey` when the same
    /// (definition, key) was already used in this render pass.
    pub fn component<S: Clone + 'static>(
        &self,
        definition: &Rc<Definition<S>>,
        props: Props,
    ) -> Result<View> {
        let node = self.tree.resolve_child(&self.parent, definition, props)?;
        Ok(View::Component { node })
    }

    /// The node being rendered.
    pub fn node(&self) -> NodeId {
        self.parent.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let view = View::element("li")
            .class("todo")
            .class("completed")
            .id("t1")
            .child(View::text("milk"));

        match view {
            View::Element { tag, attrs, children } => {
                assert_eq!(tag, "li");
                assert_eq!(attrs.get("class").map(String::as_str), Some("todo completed"));
                assert_eq!(attrs.get("id").map(String::as_str), Some("t1"));
                assert_eq!(children, vec![View::Text("milk".into())]);
            }
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[test]
    fn test_attrs_ignored_on_text() {
        assert_eq!(View::text("x").class("y").child(View::Empty), View::Text("x".into()));
    }
}
