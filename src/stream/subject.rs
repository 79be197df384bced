//! Multicast subjects.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::{Emission, Observer, Source, Subscription};
use crate::error::CycleError;

// =============================================================================
// Subject
// =============================================================================

/// Hot multicast entry point.
///
/// Observers are notified in subscription order. Late subscribers see only
/// emissions pushed after they subscribed.
pub struct Subject<T> {
    inner: Rc<SubjectInner<T>>,
}

struct SubjectInner<T> {
    observers: RefCell<Vec<(u64, Observer<T>)>>,
    next_id: Cell<u64>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> SubjectInner<T> {
    fn add(&self, observer: Observer<T>) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.observers.borrow_mut().push((id, observer));
        id
    }

    fn remove(&self, id: u64) {
        self.observers.borrow_mut().retain(|(existing, _)| *existing != id);
    }

    fn emit(&self, emission: Emission<T>) {
        // Snapshot so observers may subscribe or unsubscribe re-entrantly.
        let snapshot: Vec<Observer<T>> = self
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in snapshot {
            observer(emission.clone());
        }
    }
}

impl<T: Clone + 'static> Subject<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SubjectInner {
                observers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    pub fn next(&self, value: T) {
        self.inner.emit(Emission::Next(value));
    }

    pub fn error(&self, error: CycleError) {
        self.inner.emit(Emission::Error(error));
    }

    pub fn emit(&self, emission: Emission<T>) {
        self.inner.emit(emission);
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    /// Source view of this subject.
    pub fn source(&self) -> Source<T> {
        let inner = self.inner.clone();
        Source::new(move |observer| {
            let id = inner.add(observer);
            let weak: Weak<SubjectInner<T>> = Rc::downgrade(&inner);
            Subscription::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.remove(id);
                }
            })
        })
    }
}

// =============================================================================
// Latest
// =============================================================================

/// A subject that remembers its most recent value and replays it to each new
/// subscriber before any later emission.
///
/// Aggregators keep their current member set here and multiplexer entries
/// keep their current target element, so a consumer connecting after a
/// membership change still starts from the current membership.
pub struct Latest<T> {
    subject: Subject<T>,
    current: Rc<RefCell<T>>,
}

impl<T> Clone for Latest<T> {
    fn clone(&self) -> Self {
        Self {
            subject: self.subject.clone(),
            current: self.current.clone(),
        }
    }
}

impl<T: Clone + 'static> Latest<T> {
    pub fn new(initial: T) -> Self {
        Self {
            subject: Subject::new(),
            current: Rc::new(RefCell::new(initial)),
        }
    }

    pub fn next(&self, value: T) {
        *self.current.borrow_mut() = value.clone();
        self.subject.next(value);
    }

    pub fn get(&self) -> T {
        self.current.borrow().clone()
    }

    pub fn observer_count(&self) -> usize {
        self.subject.observer_count()
    }

    pub fn source(&self) -> Source<T> {
        let subject = self.subject.clone();
        let current = self.current.clone();
        Source::new(move |observer: Observer<T>| {
            // Register first so a re-entrant `next` during replay still reaches us.
            let subscription = subject.source().subscribe_with(observer.clone());
            let value = current.borrow().clone();
            observer(Emission::Next(value));
            subscription
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<T: Clone + 'static>(source: &Source<T>) -> (Rc<RefCell<Vec<T>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let sub = source.on_next(move |v| seen_clone.borrow_mut().push(v));
        (seen, sub)
    }

    #[test]
    fn test_subject_multicast_in_subscription_order() {
        let subject = Subject::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let first = order.clone();
        let _a = subject.source().on_next(move |v: i32| first.borrow_mut().push(("a", v)));
        let second = order.clone();
        let _b = subject.source().on_next(move |v: i32| second.borrow_mut().push(("b", v)));

        subject.next(1);
        assert_eq!(*order.borrow(), vec![("a", 1), ("b", 1)]);
    }

    #[test]
    fn test_subject_no_replay() {
        let subject = Subject::new();
        subject.next(1);
        let (seen, _sub) = collect(&subject.source());
        subject.next(2);
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn test_latest_replays_current() {
        let latest = Latest::new(0);
        latest.next(5);

        let (seen, _sub) = collect(&latest.source());
        latest.next(6);

        assert_eq!(*seen.borrow(), vec![5, 6]);
        assert_eq!(latest.get(), 6);
    }
}
