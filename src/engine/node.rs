//! Per-node reactive core and the typed instance behind it.
//!
//! [`NodeCore`] holds everything that does not depend on the state type: the
//! action bus, the children aggregator, the event table, props, phase and
//! the owned subscriptions. [`Instance`] holds the typed state and the
//! definition, and is reached through the type-erased [`NodeBehavior`].

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use spark_signals::{Signal, signal};
use tracing::error;

use crate::dom::{DomSource, ElementRef, EventTable};
use crate::error::{CycleError, Result};
use crate::pipeline::{
    build_action_stream, build_state_stream, ActionBus, Aggregator, Reducer, ReducerCall,
    StateChange, SET_STATE,
};
use crate::stream::{DisposeBag, Emission, Source, Subject, Subscription};
use crate::types::{Action, NodeId, Phase, Props};
use crate::view::{ElementBuilder, View};

use super::definition::{Accessors, Definition, PropReader, StateReader, UpdateContext};
use super::registry::ChildKey;
use super::sources::Sources;

// =============================================================================
// NodeCore
// =============================================================================

pub(crate) struct NodeCore {
    pub id: NodeId,
    pub name: Rc<str>,
    pub bus: ActionBus,
    pub aggregator: Aggregator,
    pub events: EventTable,
    pub sources: Sources,
    pub props: Rc<RefCell<Props>>,
    pub phase: Cell<Phase>,
    pub times_rendered: Cell<u64>,
    /// Bumped on every state emission and on failure.
    pub revision: Signal<u64>,
    pub failure: RefCell<Option<CycleError>>,
    pub subscriptions: RefCell<DisposeBag>,
    pub element: RefCell<Option<ElementRef>>,
    /// Children resolved during the current render pass.
    pub rendered_keys: RefCell<HashSet<ChildKey>>,
}

impl NodeCore {
    pub fn new(id: NodeId, name: &str, props: Props) -> Rc<Self> {
        let bus = ActionBus::new();
        let aggregator = Aggregator::new();
        let events = EventTable::new();
        let sources = Sources::new(
            DomSource::new(events.clone()),
            bus.source(),
            aggregator.output(),
        );

        Rc::new(Self {
            id,
            name: Rc::from(name),
            bus,
            aggregator,
            events,
            sources,
            props: Rc::new(RefCell::new(props)),
            phase: Cell::new(Phase::Uninitialized),
            times_rendered: Cell::new(0),
            revision: signal(0),
            failure: RefCell::new(None),
            subscriptions: RefCell::new(DisposeBag::new()),
            element: RefCell::new(None),
            rendered_keys: RefCell::new(HashSet::new()),
        })
    }

    /// What this node contributes to its parent's aggregator: its own
    /// actions plus everything aggregated below it.
    pub fn upstream_actions(&self) -> Source<Action> {
        Source::merge(vec![self.bus.source(), self.aggregator.output()])
    }

    pub fn bump_revision(&self) {
        self.revision.set(self.revision.get() + 1);
    }
}

// =============================================================================
// NodeBehavior
// =============================================================================

/// Type-erased view of a node's definition and state.
pub(crate) trait NodeBehavior {
    fn render(&self, core: &NodeCore, ui: &ElementBuilder<'_>) -> Result<View>;

    /// Feed the declared action sources into the bus.
    fn start_actions(&self, core: &NodeCore) -> Option<Subscription>;

    /// Build the reducer pipeline and subscribe host-visible state to it.
    fn start_state(&self, core: &Rc<NodeCore>) -> Subscription;

    fn should_update(&self, core: &NodeCore) -> bool;

    fn did_mount(&self, core: &NodeCore);

    fn did_update(&self, core: &NodeCore, element: &ElementRef);

    fn will_unmount(&self);

    /// Reducer name and action of the latest fold.
    fn last_action(&self) -> Option<(String, Action)>;

    fn as_any(&self) -> &dyn Any;
}

// =============================================================================
// Instance
// =============================================================================

pub(crate) struct Instance<S> {
    definition: Rc<Definition<S>>,
    state: Rc<RefCell<S>>,
    /// Props and state at the last mount or update.
    committed: RefCell<Option<(Props, S)>>,
    last_change: Rc<RefCell<Option<(String, Action)>>>,
    overrides: Subject<ReducerCall<S>>,
    /// Republishes the fold's output; closes with the node.
    changes: Subject<StateChange<S>>,
}

impl<S: Clone + 'static> Instance<S> {
    pub fn new(definition: Rc<Definition<S>>) -> Self {
        let state = definition.initial_state().clone();
        Self {
            definition,
            state: Rc::new(RefCell::new(state)),
            committed: RefCell::new(None),
            last_change: Rc::new(RefCell::new(None)),
            overrides: Subject::new(),
            changes: Subject::new(),
        }
    }

    pub fn state(&self) -> S {
        self.state.borrow().clone()
    }

    /// The node's state sequence, starting from the current state.
    ///
    /// Subscribers are not part of the pipeline: after unmount they simply
    /// stop receiving.
    pub fn state_changes(&self) -> Source<StateChange<S>> {
        self.changes.source().start_with(StateChange {
            state: self.state(),
            reducer: None,
            action: None,
        })
    }

    /// Replace the state from outside the node.
    ///
    /// While the pipeline runs, the new state goes through the override
    /// channel so it is folded in order with reducer output.
    pub fn set_state(&self, core: &NodeCore, state: S) {
        if core.phase.get() == Phase::Mounted && self.overrides.observer_count() > 0 {
            self.overrides.next(ReducerCall {
                reducer: Reducer::replace(state),
                action: Action::new(SET_STATE),
            });
        } else {
            *self.state.borrow_mut() = state;
            core.bump_revision();
        }
    }

    fn commit(&self, core: &NodeCore) {
        let props = core.props.borrow().clone();
        *self.committed.borrow_mut() = Some((props, self.state()));
    }
}

impl<S: Clone + 'static> NodeBehavior for Instance<S> {
    fn render(&self, core: &NodeCore, ui: &ElementBuilder<'_>) -> Result<View> {
        // Clone out so the view may call back into the tree.
        let state = self.state();
        let props = core.props.borrow().clone();
        (self.definition.view)(&state, &props, ui)
    }

    fn start_actions(&self, core: &NodeCore) -> Option<Subscription> {
        let factory = self.definition.actions.as_ref()?;
        let accessors = Accessors {
            props: PropReader::new(core.props.clone()),
            state: StateReader::new(self.state.clone()),
        };
        let declared = factory(&core.sources, &accessors);
        Some(core.bus.feed(&build_action_stream(declared)))
    }

    fn start_state(&self, core: &Rc<NodeCore>) -> Subscription {
        let mut sources = match &self.definition.reducers {
            Some(factory) => factory(&core.sources, &PropReader::new(core.props.clone())),
            None => Vec::new(),
        };
        sources.push(self.overrides.source());

        let stream = build_state_stream(&core.name, sources, self.state());

        let state = self.state.clone();
        let last_change = self.last_change.clone();
        let changes = self.changes.clone();
        let weak = Rc::downgrade(core);
        stream.subscribe(move |emission| {
            let Some(core) = weak.upgrade() else { return };
            match &emission {
                Emission::Next(change) => {
                    *state.borrow_mut() = change.state.clone();
                    if let (Some(reducer), Some(action)) = (&change.reducer, &change.action) {
                        *last_change.borrow_mut() = Some((reducer.clone(), action.clone()));
                    }
                    core.bump_revision();
                }
                Emission::Error(err) => {
                    error!(node = %core.id, component = %core.name, error = %err, "state sequence terminated");
                    *core.failure.borrow_mut() = Some(err.clone());
                    core.bump_revision();
                }
            }
            changes.emit(emission);
        })
    }

    fn should_update(&self, core: &NodeCore) -> bool {
        let Some(hook) = &self.definition.should_update else {
            return true;
        };
        let next_props = core.props.borrow().clone();
        let next_state = self.state();
        let committed = self.committed.borrow().clone();
        match committed {
            Some((prev_props, prev_state)) => hook(&next_props, &next_state, &prev_props, &prev_state),
            None => true,
        }
    }

    fn did_mount(&self, core: &NodeCore) {
        self.commit(core);
        if let Some(hook) = &self.definition.on_mount {
            hook();
        }
    }

    fn did_update(&self, core: &NodeCore, element: &ElementRef) {
        let previous = self.committed.borrow().clone();
        self.commit(core);
        let Some(hook) = &self.definition.on_update else {
            return;
        };
        let props = core.props.borrow().clone();
        let state = self.state();
        hook(&UpdateContext {
            element,
            props: &props,
            state: &state,
            prev_props: previous.as_ref().map(|(props, _)| props),
            prev_state: previous.as_ref().map(|(_, state)| state),
        });
    }

    fn will_unmount(&self) {
        if let Some(hook) = &self.definition.on_unmount {
            hook();
        }
    }

    fn last_action(&self) -> Option<(String, Action)> {
        self.last_change.borrow().clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
