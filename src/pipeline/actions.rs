//! Action bus - each node's multicast stream of declared actions.
//!
//! The definition's actions factory returns `Source<Option<Action>>`s; they
//! are merged in declaration order, `None` is dropped, and what remains is
//! pushed into the node's bus. The bus feeds the node's own reducers and the
//! parent's children aggregator. It does not replay.

use crate::stream::{Source, Subject};
use crate::types::Action;

use super::state::{Reducer, ReducerCall};

/// Multicast action stream owned by one node.
#[derive(Clone, Default)]
pub struct ActionBus {
    subject: Subject<Action>,
}

impl ActionBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, action: Action) {
        self.subject.next(action);
    }

    pub fn source(&self) -> Source<Action> {
        self.subject.source()
    }

    /// Forward every emission of `source` (values and errors) into the bus.
    pub(crate) fn feed(&self, source: &Source<Action>) -> crate::stream::Subscription {
        let subject = self.subject.clone();
        source.subscribe(move |emission| subject.emit(emission))
    }

    pub fn observer_count(&self) -> usize {
        self.subject.observer_count()
    }
}

/// Merge declared action sources and drop absent values.
pub fn build_action_stream(declared: Vec<Source<Option<Action>>>) -> Source<Action> {
    Source::merge(declared).filter_map(|action| action)
}

impl Source<Action> {
    /// Keep only actions whose kind equals `kind`.
    pub fn filter_by_type(&self, kind: impl Into<String>) -> Source<Action> {
        let kind = kind.into();
        self.filter(move |action| action.kind == kind)
    }
}

impl<T: Into<Action> + 'static> Source<T> {
    /// Pair every value with `reducer`, producing a reducer source.
    pub fn reducer<S: 'static>(&self, reducer: Reducer<S>) -> Source<ReducerCall<S>> {
        self.map(move |value| ReducerCall {
            reducer: reducer.clone(),
            action: value.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_action_stream_filters_absent() {
        let raw: Subject<Option<Action>> = Subject::new();
        let stream = build_action_stream(vec![raw.source(), raw.source().map(|_| None)]);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let _sub = stream.on_next(move |a| seen_clone.borrow_mut().push(a.kind));

        raw.next(None);
        raw.next(Some(Action::new("testActions")));

        assert_eq!(*seen.borrow(), vec!["testActions".to_string()]);
    }

    #[test]
    fn test_bus_is_multicast_without_replay() {
        let bus = ActionBus::new();
        bus.emit(Action::new("early"));

        let a = Rc::new(RefCell::new(Vec::new()));
        let b = Rc::new(RefCell::new(Vec::new()));
        let a_clone = a.clone();
        let b_clone = b.clone();
        let _sa = bus.source().on_next(move |x| a_clone.borrow_mut().push(x.kind));
        let _sb = bus.source().on_next(move |x| b_clone.borrow_mut().push(x.kind));

        bus.emit(Action::new("late"));

        assert_eq!(*a.borrow(), vec!["late".to_string()]);
        assert_eq!(*b.borrow(), vec!["late".to_string()]);
        assert_eq!(bus.observer_count(), 2);
    }

    #[test]
    fn test_filter_by_type() {
        let bus = ActionBus::new();
        let seen = Rc::new(RefCell::new(0));
        let seen_clone = seen.clone();
        let _sub = bus
            .source()
            .filter_by_type("buttonClicked")
            .on_next(move |_| *seen_clone.borrow_mut() += 1);

        bus.emit(Action::new("buttonClicked"));
        bus.emit(Action::new("other"));
        bus.emit(Action::new("buttonClicked"));

        assert_eq!(*seen.borrow(), 2);
    }
}
