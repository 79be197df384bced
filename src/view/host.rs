//! Reference host - turns a tree's views into host elements.
//!
//! Each pass renders the root recursively:
//! - a node's view is rendered, its child components are rendered in place,
//!   then the node is mounted (first pass) or updated
//! - children therefore mount and update before their parents
//! - a mounted node whose `should_update` vetoes keeps its previous element;
//!   its subtree still counts as visited, and descendants whose revision
//!   moved are re-rendered and swapped into the kept element
//! - nodes not reached in a pass are unmounted, deepest first
//!
//! [`Host::refresh`] re-renders only when some node's revision moved since
//! the last pass.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::debug;

use crate::dom::{Element, ElementRef};
use crate::engine::Tree;
use crate::error::Result;
use crate::types::{NodeId, Phase};

use super::View;

/// Tag of the element standing in for an empty view.
pub const EMPTY_TAG: &str = "#empty";

pub struct Host {
    tree: Tree,
    root: NodeId,
    elements: HashMap<NodeId, ElementRef>,
    rendered_revisions: HashMap<NodeId, u64>,
}

impl Host {
    pub fn new(tree: Tree, root: NodeId) -> Self {
        Self {
            tree,
            root,
            elements: HashMap::new(),
            rendered_revisions: HashMap::new(),
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Run one render pass and return the root element.
    pub fn render(&mut self) -> Result<ElementRef> {
        let mut visited = Vec::new();
        let element = self.render_node(self.root, &mut visited)?;
        self.unmount_unvisited(&visited)?;

        self.rendered_revisions = self
            .tree
            .all_components()
            .into_iter()
            .filter_map(|node| self.tree.revision(node).ok().map(|rev| (node, rev)))
            .collect();
        debug!(tree = %self.tree.config().label, nodes = visited.len(), "render pass complete");
        Ok(element)
    }

    /// Re-render if any node's state moved since the last pass.
    pub fn refresh(&mut self) -> Result<Option<ElementRef>> {
        if !self.is_dirty() {
            return Ok(None);
        }
        self.render().map(Some)
    }

    pub fn is_dirty(&self) -> bool {
        self.tree.all_components().into_iter().any(|node| {
            self.tree.revision(node).ok() != self.rendered_revisions.get(&node).copied()
        })
    }

    /// Element of `node` from the latest pass.
    pub fn element(&self, node: NodeId) -> Option<ElementRef> {
        self.elements.get(&node).cloned()
    }

    pub fn root_element(&self) -> Option<ElementRef> {
        self.element(self.root)
    }

    /// Tear the whole tree down.
    pub fn unmount(&mut self) -> Result<()> {
        if self.tree.contains(self.root) {
            self.tree.unmount(self.root)?;
        }
        self.elements.clear();
        self.rendered_revisions.clear();
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn render_node(&mut self, node: NodeId, visited: &mut Vec<NodeId>) -> Result<ElementRef> {
        visited.push(node);
        let phase = self.tree.phase(node)?;

        if phase == Phase::Mounted && !self.tree.should_update(node)? {
            if let Some(element) = self.elements.get(&node).cloned() {
                self.refresh_retained(node, &element, visited)?;
                return Ok(element);
            }
        }

        let view = self.tree.render(node)?;
        let element = self.materialize(&view, visited)?;
        match phase {
            Phase::Uninitialized => self.tree.mount(node, &element)?,
            _ => self.tree.update(node, &element)?,
        }
        self.elements.insert(node, element.clone());
        Ok(element)
    }

    fn materialize(&mut self, view: &View, visited: &mut Vec<NodeId>) -> Result<ElementRef> {
        match view {
            View::Empty => Ok(Element::new(EMPTY_TAG)),
            View::Text(content) => Ok(Element::text_node(content.clone())),
            View::Element {
                tag,
                attrs,
                children,
            } => {
                let element = Element::new(tag.clone());
                for (name, value) in attrs {
                    element.set_attr(name.clone(), value.clone());
                }
                for child in children {
                    element.append_child(self.materialize(child, visited)?);
                }
                Ok(element)
            }
            View::Component { node } => self.render_node(*node, visited),
        }
    }

    /// Walk the children of a vetoed node. Children whose revision moved
    /// render again and replace their old element inside `retained`; the
    /// rest are walked the same way.
    fn refresh_retained(
        &mut self,
        node: NodeId,
        retained: &ElementRef,
        visited: &mut Vec<NodeId>,
    ) -> Result<()> {
        for child in self.tree.children(node)? {
            let previous = self.elements.get(&child).cloned();
            let moved = self.tree.revision(child).ok() != self.rendered_revisions.get(&child).copied();
            match previous {
                Some(previous) if !moved => {
                    visited.push(child);
                    self.refresh_retained(child, &previous, visited)?;
                }
                Some(previous) => {
                    let fresh = self.render_node(child, visited)?;
                    if !Rc::ptr_eq(&previous, &fresh) {
                        retained.replace_descendant(&previous, fresh);
                    }
                }
                None => {
                    self.render_node(child, visited)?;
                }
            }
        }
        Ok(())
    }

    fn unmount_unvisited(&mut self, visited: &[NodeId]) -> Result<()> {
        let visited: HashSet<NodeId> = visited.iter().copied().collect();
        let mut stale = Vec::new();
        for node in self.tree.all_components() {
            if !visited.contains(&node) {
                stale.push((self.tree.depth(node)?, node));
            }
        }
        stale.sort_by(|a, b| b.0.cmp(&a.0));

        for (_, node) in stale {
            // An ancestor's guard may already have taken it down.
            if self.tree.contains(node) {
                self.tree.unmount(node)?;
            }
            self.elements.remove(&node);
            self.rendered_revisions.remove(&node);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::dom::EventData;
    use crate::engine::{create_tree, Definition};
    use crate::pipeline::Reducer;
    use crate::types::Props;

    fn counter() -> Rc<Definition<i64>> {
        Definition::new("Counter", 0i64, |count, _, ui| {
            Ok(ui
                .element("div")
                .child(ui.element("button").class("inc").child(ui.text(count.to_string()))))
        })
        .reducers(|sources, _| {
            vec![sources
                .select(".inc")
                .events("click")
                .reducer(Reducer::new("increment", |count: i64, _| count + 1))]
        })
        .build()
    }

    #[test]
    fn test_render_mount_and_refresh() {
        let tree = create_tree();
        let root = tree.create_root(&counter(), Props::new()).expect("root");
        let mut host = Host::new(tree.clone(), root);

        let element = host.render().expect("first pass");
        assert_eq!(element.text_content(), "0");
        assert_eq!(tree.phase(root), Ok(Phase::Mounted));
        assert!(!host.is_dirty());
        assert_eq!(host.refresh().expect("clean").map(|_| ()), None);

        let button = element.query_selector(".inc").expect("button");
        button.dispatch("click", EventData::None);
        assert!(host.is_dirty());

        let element = host.refresh().expect("refresh").expect("dirty");
        assert_eq!(element.text_content(), "1");

        // Old element is detached from the multiplexer after the rebind.
        button.dispatch("click", EventData::None);
        assert_eq!(tree.state::<i64>(root), Ok(1));
        element
            .query_selector(".inc")
            .expect("button")
            .dispatch("click", EventData::None);
        assert_eq!(tree.state::<i64>(root), Ok(2));
    }

    #[test]
    fn test_unreached_children_are_unmounted() {
        let unmounts = Rc::new(Cell::new(0));
        let unmounts_clone = unmounts.clone();
        let item = Definition::new("Item", (), |_, props, ui| {
            Ok(ui.element("li").child(ui.text(props.get_str("title").unwrap_or_default())))
        })
        .on_unmount(move || unmounts_clone.set(unmounts_clone.get() + 1))
        .build();
        let item_for_view = item.clone();
        let list = Definition::new("List", vec!["a".to_string(), "b".to_string()], move |items, _, ui| {
            let mut children = Vec::new();
            for title in items {
                children.push(ui.component(
                    &item_for_view,
                    Props::new().key(title.clone()).with("title", title.as_str()),
                )?);
            }
            Ok(ui.element("ul").children(children))
        })
        .build();

        let tree = create_tree();
        let root = tree.create_root(&list, Props::new()).expect("root");
        let mut host = Host::new(tree.clone(), root);
        assert_eq!(host.render().expect("render").text_content(), "ab");
        assert_eq!(tree.children(root).map(|c| c.len()), Ok(2));

        tree.set_state(root, vec!["b".to_string()]).expect("set");
        let element = host.refresh().expect("refresh").expect("dirty");

        assert_eq!(element.text_content(), "b");
        assert_eq!(unmounts.get(), 1);
        assert_eq!(tree.children(root).map(|c| c.len()), Ok(1));
    }

    #[test]
    fn test_veto_keeps_previous_element() {
        let renders = Rc::new(Cell::new(0));
        let renders_clone = renders.clone();
        let frozen = Definition::new("Frozen", 0i64, move |count, _, ui| {
            renders_clone.set(renders_clone.get() + 1);
            Ok(ui.element("div").child(ui.text(count.to_string())))
        })
        .should_update(|_, _, _, _| false)
        .build();

        let tree = create_tree();
        let root = tree.create_root(&frozen, Props::new()).expect("root");
        let mut host = Host::new(tree.clone(), root);
        let first = host.render().expect("render");

        tree.set_state(root, 5i64).expect("set");
        let second = host.render().expect("render");

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(renders.get(), 1);
        assert_eq!(tree.state::<i64>(root), Ok(5));
    }

    #[test]
    fn test_vetoed_parent_still_refreshes_children() {
        let child = counter();
        let parent_renders = Rc::new(Cell::new(0));
        let renders_clone = parent_renders.clone();
        let parent = Definition::new("Frame", (), move |_, _, ui| {
            renders_clone.set(renders_clone.get() + 1);
            Ok(ui
                .element("section")
                .child(ui.element("div").class("slot").child(ui.component(&child, Props::new())?)))
        })
        .should_update(|_, _, _, _| false)
        .build();

        let tree = create_tree();
        let root = tree.create_root(&parent, Props::new()).expect("root");
        let mut host = Host::new(tree.clone(), root);
        let first = host.render().expect("render");
        let inner = tree.children(root).expect("children")[0];

        first
            .query_selector(".inc")
            .expect("button")
            .dispatch("click", EventData::None);
        assert_eq!(tree.state::<i64>(inner), Ok(1));

        let second = host.refresh().expect("refresh").expect("dirty");
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(parent_renders.get(), 1);
        assert_eq!(second.text_content(), "1");
        assert_eq!(tree.phase(inner), Ok(Phase::Mounted));

        // The child's fresh element is live for the next click.
        second
            .query_selector(".inc")
            .expect("button")
            .dispatch("click", EventData::None);
        let third = host.refresh().expect("refresh").expect("dirty");
        assert_eq!(third.text_content(), "2");
    }
}
