//! Reducer pipeline - per-node fold of tagged actions over state.
//!
//! ```text
//! reducer src 0  ─┐
//! reducer src 1  ─┼─ merge ─ seed(initial) ─ fold ─ share ─→ StateChange stream
//! override chan ──┘
//! ```
//!
//! The fold is strictly sequential. A reducer call arriving while a previous
//! fold is still delivering its result (an observer reacting synchronously)
//! is queued and folded afterwards, in arrival order.
//!
//! A reducer error terminates the sequence: observers receive one
//! `ReducerFailure` and nothing afterwards.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt::Display;
use std::rc::Rc;

use crate::error::CycleError;
use crate::stream::{Emission, Observer, Source, Subscription};
use crate::types::Action;

// =============================================================================
// Reducer
// =============================================================================

/// A named `(state, action) -> state` function.
pub struct Reducer<S> {
    name: Rc<str>,
    apply: Rc<dyn Fn(S, &Action) -> Result<S, String>>,
}

impl<S> Clone for Reducer<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            apply: self.apply.clone(),
        }
    }
}

impl<S: 'static> Reducer<S> {
    /// An infallible reducer.
    pub fn new(name: &str, f: impl Fn(S, &Action) -> S + 'static) -> Self {
        Self {
            name: Rc::from(name),
            apply: Rc::new(move |state, action| Ok(f(state, action))),
        }
    }

    /// A reducer that may fail. A failure terminates the owning node's
    /// state sequence.
    pub fn try_new<E: Display>(
        name: &str,
        f: impl Fn(S, &Action) -> Result<S, E> + 'static,
    ) -> Self {
        Self {
            name: Rc::from(name),
            apply: Rc::new(move |state, action| f(state, action).map_err(|e| e.to_string())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, state: S, action: &Action) -> Result<S, String> {
        (self.apply)(state, action)
    }
}

impl<S: Clone + 'static> Reducer<S> {
    /// A reducer that ignores its input and yields `state`.
    pub fn replace(state: S) -> Self {
        Self::new(SET_STATE, move |_, _| state.clone())
    }
}

/// Reducer name and action kind used by the override channel.
pub const SET_STATE: &str = "setState";

/// One pending fold step.
pub struct ReducerCall<S> {
    pub reducer: Reducer<S>,
    pub action: Action,
}

impl<S> Clone for ReducerCall<S> {
    fn clone(&self) -> Self {
        Self {
            reducer: self.reducer.clone(),
            action: self.action.clone(),
        }
    }
}

/// One value of a node's state sequence, with the reducer and action that
/// produced it (both `None` for the seed).
#[derive(Clone, Debug, PartialEq)]
pub struct StateChange<S> {
    pub state: S,
    pub reducer: Option<String>,
    pub action: Option<Action>,
}

// =============================================================================
// State stream
// =============================================================================

/// Build the shared state sequence for one node.
///
/// # Arguments
/// * `component` - Display name, used in failure reports
/// * `sources` - Reducer sources, in registration order
/// * `initial` - Seed emitted before any fold
pub fn build_state_stream<S: Clone + 'static>(
    component: &str,
    sources: Vec<Source<ReducerCall<S>>>,
    initial: S,
) -> Source<StateChange<S>> {
    let component: Rc<str> = Rc::from(component);
    let merged = Source::merge(sources);

    Source::new(move |observer: Observer<StateChange<S>>| {
        let fold = Rc::new(Fold {
            component: component.clone(),
            state: RefCell::new(Some(initial.clone())),
            pending: RefCell::new(VecDeque::new()),
            draining: Cell::new(false),
            failed: Cell::new(false),
            observer,
        });

        (fold.observer)(Emission::Next(StateChange {
            state: initial.clone(),
            reducer: None,
            action: None,
        }));

        let fold_for_upstream = fold.clone();
        let upstream = merged.subscribe(move |emission| match emission {
            Emission::Next(call) => fold_for_upstream.push(call),
            Emission::Error(err) => fold_for_upstream.fail(err),
        });
        Subscription::new(move || {
            upstream.unsubscribe();
            fold.pending.borrow_mut().clear();
        })
    })
    .share()
}

struct Fold<S> {
    component: Rc<str>,
    state: RefCell<Option<S>>,
    pending: RefCell<VecDeque<ReducerCall<S>>>,
    draining: Cell<bool>,
    failed: Cell<bool>,
    observer: Observer<StateChange<S>>,
}

impl<S: Clone + 'static> Fold<S> {
    fn push(&self, call: ReducerCall<S>) {
        if self.failed.get() {
            return;
        }
        self.pending.borrow_mut().push_back(call);
        if self.draining.replace(true) {
            return;
        }

        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(call) = next else { break };
            let current = self.state.borrow_mut().take();
            let Some(current) = current else { break };

            match call.reducer.apply(current, &call.action) {
                Ok(state) => {
                    *self.state.borrow_mut() = Some(state.clone());
                    (self.observer)(Emission::Next(StateChange {
                        state,
                        reducer: Some(call.reducer.name().to_string()),
                        action: Some(call.action),
                    }));
                }
                Err(message) => {
                    self.fail(CycleError::ReducerFailure {
                        component: self.component.to_string(),
                        reducer: call.reducer.name().to_string(),
                        message,
                    });
                    break;
                }
            }
        }

        self.draining.set(false);
    }

    fn fail(&self, error: CycleError) {
        if self.failed.replace(true) {
            return;
        }
        self.pending.borrow_mut().clear();
        (self.observer)(Emission::Error(error));
    }
}
