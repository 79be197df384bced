//! Component definitions - immutable recipes nodes are built from.
//!
//! A definition bundles the initial state, the optional actions and
//! reducers factories, the view and the optional lifecycle hooks. The engine
//! never mutates a definition; its identity is the address of the `Rc`
//! returned by [`Definition::build`].
//!
//! # Example
//!
//! ```ignore
//! let counter = Definition::new("Counter", 0i64, |count, _props, ui| {
//!     Ok(ui.element("div").child(
//!         ui.element("button").class("inc").child(View::text(count.to_string())),
//!     ))
//! })
//! .reducers(|sources, _props| {
//!     vec![sources
//!         .select(".inc")
//!         .events("click")
//!         .reducer(Reducer::new("increment", |count, _| count + 1))]
//! })
//! .build();
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::dom::ElementRef;
use crate::error::Result;
use crate::pipeline::ReducerCall;
use crate::stream::Source;
use crate::types::{Action, DefinitionId, Key, Props};
use crate::view::{ElementBuilder, View};

use super::sources::Sources;

// =============================================================================
// Factory and hook signatures
// =============================================================================

pub type ViewFn<S> = dyn Fn(&S, &Props, &ElementBuilder<'_>) -> Result<View>;
pub type ActionsFactory<S> = dyn Fn(&Sources, &Accessors<S>) -> Vec<Source<Option<Action>>>;
pub type ReducersFactory<S> = dyn Fn(&Sources, &PropReader) -> Vec<Source<ReducerCall<S>>>;
pub type UpdateHook<S> = dyn Fn(&UpdateContext<'_, S>);
/// `(next_props, next_state, prev_props, prev_state) -> render?`
pub type ShouldUpdateHook<S> = dyn Fn(&Props, &S, &Props, &S) -> bool;

// =============================================================================
// Definition
// =============================================================================

pub struct Definition<S> {
    name: String,
    initial_state: S,
    pub(crate) view: Box<ViewFn<S>>,
    pub(crate) actions: Option<Box<ActionsFactory<S>>>,
    pub(crate) reducers: Option<Box<ReducersFactory<S>>>,
    pub(crate) on_mount: Option<Box<dyn Fn()>>,
    pub(crate) on_update: Option<Box<UpdateHook<S>>>,
    pub(crate) on_unmount: Option<Box<dyn Fn()>>,
    pub(crate) should_update: Option<Box<ShouldUpdateHook<S>>>,
}

impl<S: Clone + 'static> Definition<S> {
    /// Start a definition from its display name, initial state and view.
    pub fn new(
        name: impl Into<String>,
        initial_state: S,
        view: impl Fn(&S, &Props, &ElementBuilder<'_>) -> Result<View> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            initial_state,
            view: Box::new(view),
            actions: None,
            reducers: None,
            on_mount: None,
            on_update: None,
            on_unmount: None,
            should_update: None,
        }
    }

    /// Declare the sources feeding this component's action bus.
    pub fn actions(
        mut self,
        factory: impl Fn(&Sources, &Accessors<S>) -> Vec<Source<Option<Action>>> + 'static,
    ) -> Self {
        self.actions = Some(Box::new(factory));
        self
    }

    /// Declare the reducer sources folded into this component's state.
    pub fn reducers(
        mut self,
        factory: impl Fn(&Sources, &PropReader) -> Vec<Source<ReducerCall<S>>> + 'static,
    ) -> Self {
        self.reducers = Some(Box::new(factory));
        self
    }

    pub fn on_mount(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_mount = Some(Box::new(hook));
        self
    }

    pub fn on_update(mut self, hook: impl Fn(&UpdateContext<'_, S>) + 'static) -> Self {
        self.on_update = Some(Box::new(hook));
        self
    }

    pub fn on_unmount(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_unmount = Some(Box::new(hook));
        self
    }

    /// Veto re-renders. Subscription and disposal bookkeeping still runs.
    pub fn should_update(
        mut self,
        hook: impl Fn(&Props, &S, &Props, &S) -> bool + 'static,
    ) -> Self {
        self.should_update = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> Rc<Self> {
        Rc::new(self)
    }
}

impl<S> Definition<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial_state(&self) -> &S {
        &self.initial_state
    }

    /// Identity used by child registries.
    pub fn id(self: &Rc<Self>) -> DefinitionId {
        DefinitionId(Rc::as_ptr(self) as *const () as usize)
    }
}

// =============================================================================
// Accessors handed to factories
// =============================================================================

/// Reads the node's current props.
#[derive(Clone)]
pub struct PropReader {
    props: Rc<RefCell<Props>>,
}

impl PropReader {
    pub(crate) fn new(props: Rc<RefCell<Props>>) -> Self {
        Self { props }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.props.borrow().get(name).cloned()
    }

    pub fn key(&self) -> Option<Key> {
        self.props.borrow().get_key().cloned()
    }

    pub fn props(&self) -> Props {
        self.props.borrow().clone()
    }
}

/// Reads the node's current host-visible state.
pub struct StateReader<S> {
    state: Rc<RefCell<S>>,
}

impl<S> Clone for StateReader<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<S: Clone> StateReader<S> {
    pub(crate) fn new(state: Rc<RefCell<S>>) -> Self {
        Self { state }
    }

    pub fn get(&self) -> S {
        self.state.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.state.borrow())
    }
}

/// Accessors given to the actions factory.
pub struct Accessors<S> {
    pub props: PropReader,
    pub state: StateReader<S>,
}

// =============================================================================
// Update context
// =============================================================================

/// Arguments of the `on_update` hook.
pub struct UpdateContext<'a, S> {
    pub element: &'a ElementRef,
    pub props: &'a Props,
    pub state: &'a S,
    pub prev_props: Option<&'a Props>,
    pub prev_state: Option<&'a S>,
}

impl<S> UpdateContext<'_, S> {
    /// First descendant of the rendered element matching `selector`.
    pub fn select(&self, selector: &str) -> Option<ElementRef> {
        self.element.query_selector(selector)
    }
}
