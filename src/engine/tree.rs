//! The component tree - node identity, registries and per-node accessors.
//!
//! A [`Tree`] replaces any process-wide root: root uniqueness is a property
//! of the tree object, so independent trees can live side by side (tests
//! create one each).
//!
//! The arena is borrowed only for structural reads and writes. Node parts
//! are cloned out before any user code (views, reducers, hooks) runs, so
//! that code may call back into the tree.

use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::Serialize;
use spark_signals::Signal;
use tracing::debug;

use crate::config::TreeConfig;
use crate::dom::ElementRef;
use crate::error::{CycleError, Result};
use crate::pipeline::StateChange;
use crate::stream::Source;
use crate::types::{Action, DefinitionId, Key, NodeId, Phase, Props};
use crate::view::{ElementBuilder, View};

use super::definition::Definition;
use super::events::{EventMask, ListenerId, Listeners, TreeEvent};
use super::node::{Instance, NodeBehavior, NodeCore};
use super::registry::{Arena, ChildKey, ChildRegistry, NodeRecord};
use super::sources::Sources;

pub(crate) struct TreeInner {
    pub config: TreeConfig,
    pub nodes: RefCell<Arena<NodeRecord>>,
    pub root: Cell<Option<NodeId>>,
    pub listeners: Listeners,
}

/// A component tree. Cloning shares the tree.
#[derive(Clone)]
pub struct Tree {
    pub(crate) inner: Rc<TreeInner>,
}

/// Create a tree with the default configuration.
pub fn create_tree() -> Tree {
    Tree::new(TreeConfig::default())
}

/// Serializable snapshot of the tree's shape.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComponentStructure {
    pub node: NodeId,
    pub name: String,
    pub key: Option<Key>,
    pub children: Vec<ComponentStructure>,
}

impl Default for Tree {
    fn default() -> Self {
        create_tree()
    }
}

impl Tree {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            inner: Rc::new(TreeInner {
                config,
                nodes: RefCell::new(Arena::default()),
                root: Cell::new(None),
                listeners: Listeners::default(),
            }),
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.inner.config
    }

    pub fn root(&self) -> Option<NodeId> {
        self.inner.root.get().filter(|root| self.contains(*root))
    }

    // =========================================================================
    // Creation
    // =========================================================================

    pub fn create_root<S: Clone + 'static>(
        &self,
        definition: &Rc<Definition<S>>,
        props: Props,
    ) -> Result<NodeId> {
        self.create_component(definition, props, None)
    }

    /// Instantiate `definition` under `parent`, or as the root when `parent`
    /// is `None`.
    ///
    /// # Errors
    /// * `RootAlreadyExists` - parentless creation while a root is live
    /// * `DuplicateKey` - the parent already holds this (definition, key)
    /// * `UnknownNode` - `parent` is not live
    pub fn create_component<S: Clone + 'static>(
        &self,
        definition: &Rc<Definition<S>>,
        props: Props,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        let name = definition.name().to_string();
        let child_key = ChildKey {
            definition: definition.id(),
            key: props.get_key().cloned(),
        };

        let id = {
            let mut nodes = self.inner.nodes.borrow_mut();
            match parent {
                None => {
                    if self.inner.root.get().is_some_and(|root| nodes.contains(root)) {
                        return Err(CycleError::RootAlreadyExists { name });
                    }
                }
                Some(parent) => {
                    let record = nodes.get(parent).ok_or(CycleError::UnknownNode(parent))?;
                    if record.children.get(&child_key).is_some() {
                        return Err(CycleError::DuplicateKey {
                            name,
                            key: child_key.key,
                        });
                    }
                }
            }

            let id = nodes.allocate(|id| NodeRecord {
                definition: child_key.definition,
                key: child_key.key.clone(),
                parent,
                children: ChildRegistry::default(),
                core: NodeCore::new(id, &name, props),
                behavior: Rc::new(Instance::new(definition.clone())),
            });
            if let Some(record) = parent.and_then(|parent| nodes.get_mut(parent)) {
                record.children.insert(child_key, id);
            }
            id
        };

        debug!(tree = %self.inner.config.label, node = %id, component = %name, parent = ?parent, "component created");

        if parent.is_none() {
            self.inner.root.set(Some(id));
            self.emit(&TreeEvent::Initialize { root: id });
        }
        self.emit(&TreeEvent::ComponentInit { node: id, name });
        Ok(id)
    }

    /// Find the live child of `parent` for (definition, key).
    pub fn lookup(&self, parent: NodeId, definition: DefinitionId, key: Option<&str>) -> Option<NodeId> {
        let child_key = ChildKey {
            definition,
            key: key.map(String::from),
        };
        self.inner
            .nodes
            .borrow()
            .get(parent)
            .and_then(|record| record.children.get(&child_key))
    }

    /// Drop `node` from its parent's registry and stop routing its actions
    /// into the parent's `childrenActions`. A no-op for the root.
    pub fn remove(&self, node: NodeId) -> Result<()> {
        let parent = {
            let mut nodes = self.inner.nodes.borrow_mut();
            let parent = nodes.get(node).ok_or(CycleError::UnknownNode(node))?.parent;
            match parent.and_then(|parent| nodes.get_mut(parent)) {
                Some(record) => {
                    if record.children.remove(node) {
                        parent
                    } else {
                        None
                    }
                }
                None => None,
            }
        };
        match parent {
            Some(parent) => self.recompute_children_actions(parent),
            None => Ok(()),
        }
    }

    /// Free the node's slot. The root slot may be taken again afterwards.
    pub(crate) fn release(&self, node: NodeId) {
        self.inner.nodes.borrow_mut().release(node);
        if self.inner.root.get() == Some(node) {
            self.inner.root.set(None);
        }
    }

    // =========================================================================
    // Structure
    // =========================================================================

    pub fn contains(&self, node: NodeId) -> bool {
        self.inner.nodes.borrow().contains(node)
    }

    pub fn len(&self) -> usize {
        self.inner.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn children(&self, node: NodeId) -> Result<Vec<NodeId>> {
        self.with_record(node, |record| record.children.ids())
    }

    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>> {
        self.with_record(node, |record| record.parent)
    }

    /// Number of ancestors above `node`.
    pub fn depth(&self, node: NodeId) -> Result<usize> {
        let mut depth = 0;
        let mut current = self.parent(node)?;
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent)?;
        }
        Ok(depth)
    }

    pub fn structure(&self) -> Option<ComponentStructure> {
        self.root().and_then(|root| self.structure_of(root))
    }

    fn structure_of(&self, node: NodeId) -> Option<ComponentStructure> {
        let (name, key, children) = {
            let nodes = self.inner.nodes.borrow();
            let record = nodes.get(node)?;
            (record.core.name.to_string(), record.key.clone(), record.children.ids())
        };
        Some(ComponentStructure {
            node,
            name,
            key,
            children: children
                .into_iter()
                .filter_map(|child| self.structure_of(child))
                .collect(),
        })
    }

    /// Every node reachable from the root, parents before children.
    pub fn all_components(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.root().into_iter().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            if let Ok(children) = self.children(node) {
                stack.extend(children.into_iter().rev());
            }
        }
        out
    }

    // =========================================================================
    // Per-node accessors
    // =========================================================================

    pub fn name(&self, node: NodeId) -> Result<String> {
        self.with_record(node, |record| record.core.name.to_string())
    }

    pub fn key(&self, node: NodeId) -> Result<Option<Key>> {
        self.with_record(node, |record| record.key.clone())
    }

    pub fn definition_id(&self, node: NodeId) -> Result<DefinitionId> {
        self.with_record(node, |record| record.definition)
    }

    pub fn props(&self, node: NodeId) -> Result<Props> {
        self.with_record(node, |record| record.core.props.borrow().clone())
    }

    /// Host-visible state (a clone of the node's current state).
    pub fn state<S: Clone + 'static>(&self, node: NodeId) -> Result<S> {
        self.with_instance(node, |_, instance: &Instance<S>| instance.state())
    }

    /// The node's state sequence, starting with the current state.
    pub fn state_changes<S: Clone + 'static>(&self, node: NodeId) -> Result<Source<StateChange<S>>> {
        self.with_instance(node, |_, instance: &Instance<S>| instance.state_changes())
    }

    /// Replace the node's state from outside.
    pub fn set_state<S: Clone + 'static>(&self, node: NodeId, state: S) -> Result<()> {
        self.with_instance(node, |core, instance: &Instance<S>| instance.set_state(core, state))
    }

    pub fn actions(&self, node: NodeId) -> Result<Source<Action>> {
        self.with_record(node, |record| record.core.bus.source())
    }

    pub fn children_actions(&self, node: NodeId) -> Result<Source<Action>> {
        self.with_record(node, |record| record.core.aggregator.output())
    }

    pub fn sources(&self, node: NodeId) -> Result<Sources> {
        self.with_record(node, |record| record.core.sources.clone())
    }

    pub fn get_source<T: 'static>(&self, node: NodeId, name: &str) -> Result<Option<Source<T>>> {
        Ok(self.sources(node)?.get(name))
    }

    /// Register an application source on the node's sources object.
    pub fn set_source<T: 'static>(&self, node: NodeId, name: &str, source: Source<T>) -> Result<()> {
        self.sources(node)?.set(name, source)
    }

    /// Push an action into the node's bus.
    pub fn emit_action(&self, node: NodeId, action: Action) -> Result<()> {
        let (core, _) = self.parts(node)?;
        core.bus.emit(action);
        Ok(())
    }

    pub fn phase(&self, node: NodeId) -> Result<Phase> {
        self.with_record(node, |record| record.core.phase.get())
    }

    pub fn times_rendered(&self, node: NodeId) -> Result<u64> {
        self.with_record(node, |record| record.core.times_rendered.get())
    }

    pub fn revision(&self, node: NodeId) -> Result<u64> {
        self.with_record(node, |record| record.core.revision.get())
    }

    /// The revision signal, for hosts driving re-renders from effects.
    pub fn revision_signal(&self, node: NodeId) -> Result<Signal<u64>> {
        self.with_record(node, |record| record.core.revision.clone())
    }

    /// The failure that terminated the node's state sequence, if any.
    pub fn failure(&self, node: NodeId) -> Result<Option<CycleError>> {
        self.with_record(node, |record| record.core.failure.borrow().clone())
    }

    /// Reducer name and action of the node's latest fold.
    pub fn last_action(&self, node: NodeId) -> Result<Option<(String, Action)>> {
        let (_, behavior) = self.parts(node)?;
        Ok(behavior.last_action())
    }

    /// Element the node was last mounted or updated with.
    pub fn element(&self, node: NodeId) -> Result<Option<ElementRef>> {
        self.with_record(node, |record| record.core.element.borrow().clone())
    }

    // =========================================================================
    // Children actions
    // =========================================================================

    /// Recompute the aggregators from `node` up to the root, parents first.
    pub fn update_children_actions(&self, node: NodeId) -> Result<()> {
        if let Some(parent) = self.parent(node)? {
            self.update_children_actions(parent)?;
        }
        self.recompute_children_actions(node)
    }

    /// Only mounted children contribute.
    fn recompute_children_actions(&self, node: NodeId) -> Result<()> {
        let (core, members) = {
            let nodes = self.inner.nodes.borrow();
            let record = nodes.get(node).ok_or(CycleError::UnknownNode(node))?;
            let members: Vec<Source<Action>> = record
                .children
                .ids()
                .into_iter()
                .filter_map(|child| nodes.get(child))
                .filter(|child| child.core.phase.get() == Phase::Mounted)
                .map(|child| child.core.upstream_actions())
                .collect();
            (record.core.clone(), members)
        };
        core.aggregator.recompute(node, members);
        Ok(())
    }

    // =========================================================================
    // Tree events
    // =========================================================================

    /// Listen for tree events whose kind is in `mask`.
    pub fn on(&self, mask: EventMask, handler: impl Fn(&TreeEvent) + 'static) -> ListenerId {
        self.inner.listeners.add(mask, Rc::new(handler))
    }

    pub fn unbind(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    pub(crate) fn emit(&self, event: &TreeEvent) {
        self.inner.listeners.emit(event);
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Run the node's view with a fresh element builder.
    ///
    /// Starts a new render pass for duplicate detection among the node's
    /// children.
    pub fn render(&self, node: NodeId) -> Result<View> {
        let (core, behavior) = self.parts(node)?;
        core.times_rendered.set(core.times_rendered.get() + 1);
        core.rendered_keys.borrow_mut().clear();
        if core.phase.get() == Phase::Mounted {
            self.emit(&TreeEvent::ComponentWillUpdate { node });
        }
        let ui = ElementBuilder::new(self, core.clone());
        behavior.render(&core, &ui)
    }

    /// Look up or create the child of `parent` for `definition` and `props`.
    pub(crate) fn resolve_child<S: Clone + 'static>(
        &self,
        parent: &NodeCore,
        definition: &Rc<Definition<S>>,
        props: Props,
    ) -> Result<NodeId> {
        let child_key = ChildKey {
            definition: definition.id(),
            key: props.get_key().cloned(),
        };
        if !parent.rendered_keys.borrow_mut().insert(child_key.clone()) {
            return Err(CycleError::DuplicateKey {
                name: definition.name().to_string(),
                key: child_key.key,
            });
        }

        match self.lookup(parent.id, child_key.definition, child_key.key.as_deref()) {
            Some(existing) => {
                self.receive_props(existing, props)?;
                Ok(existing)
            }
            None => self.create_component(definition, props, Some(parent.id)),
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    pub(crate) fn parts(&self, node: NodeId) -> Result<(Rc<NodeCore>, Rc<dyn NodeBehavior>)> {
        self.with_record(node, |record| (record.core.clone(), record.behavior.clone()))
    }

    fn with_record<R>(&self, node: NodeId, f: impl FnOnce(&NodeRecord) -> R) -> Result<R> {
        let nodes = self.inner.nodes.borrow();
        let record = nodes.get(node).ok_or(CycleError::UnknownNode(node))?;
        Ok(f(record))
    }

    fn with_instance<S: Clone + 'static, R>(
        &self,
        node: NodeId,
        f: impl FnOnce(&NodeCore, &Instance<S>) -> R,
    ) -> Result<R> {
        let (core, behavior) = self.parts(node)?;
        let instance = behavior
            .as_any()
            .downcast_ref::<Instance<S>>()
            .ok_or_else(|| CycleError::StateTypeMismatch {
                name: core.name.to_string(),
                expected: type_name::<S>(),
            })?;
        Ok(f(&core, instance))
    }
}
