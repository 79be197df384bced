//! Operators over [`Source`].

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{Emission, Observer, Source, Subject, Subscription};

impl<T: 'static> Source<T> {
    pub fn map<U: 'static>(&self, f: impl Fn(T) -> U + 'static) -> Source<U> {
        let upstream = self.clone();
        let f = Rc::new(f);
        Source::new(move |observer: Observer<U>| {
            let f = f.clone();
            upstream.subscribe(move |emission| match emission {
                Emission::Next(value) => observer(Emission::Next(f(value))),
                Emission::Error(err) => observer(Emission::Error(err)),
            })
        })
    }

    pub fn filter(&self, predicate: impl Fn(&T) -> bool + 'static) -> Source<T> {
        let upstream = self.clone();
        let predicate = Rc::new(predicate);
        Source::new(move |observer: Observer<T>| {
            let predicate = predicate.clone();
            upstream.subscribe(move |emission| match emission {
                Emission::Next(value) => {
                    if predicate(&value) {
                        observer(Emission::Next(value));
                    }
                }
                Emission::Error(err) => observer(Emission::Error(err)),
            })
        })
    }

    pub fn filter_map<U: 'static>(&self, f: impl Fn(T) -> Option<U> + 'static) -> Source<U> {
        let upstream = self.clone();
        let f = Rc::new(f);
        Source::new(move |observer: Observer<U>| {
            let f = f.clone();
            upstream.subscribe(move |emission| match emission {
                Emission::Next(value) => {
                    if let Some(mapped) = f(value) {
                        observer(Emission::Next(mapped));
                    }
                }
                Emission::Error(err) => observer(Emission::Error(err)),
            })
        })
    }

    /// Run a side effect for every value before passing it on.
    pub fn tap(&self, f: impl Fn(&T) + 'static) -> Source<T> {
        let upstream = self.clone();
        let f = Rc::new(f);
        Source::new(move |observer: Observer<T>| {
            let f = f.clone();
            upstream.subscribe(move |emission| {
                if let Emission::Next(value) = &emission {
                    f(value);
                }
                observer(emission);
            })
        })
    }

    /// Ordered union.
    ///
    /// Each source keeps its own emission order; across sources, values
    /// interleave in arrival order. Sources are connected in list order, so
    /// when one upstream event fans out to several of them, their emissions
    /// arrive in list order too.
    pub fn merge(sources: Vec<Source<T>>) -> Source<T> {
        Source::new(move |observer: Observer<T>| {
            let subscriptions: Vec<Subscription> = sources
                .iter()
                .map(|source| source.subscribe_with(observer.clone()))
                .collect();
            Subscription::new(move || {
                for subscription in subscriptions {
                    subscription.unsubscribe();
                }
            })
        })
    }
}

impl<T: Clone + 'static> Source<T> {
    /// Emit `values` synchronously to each subscriber.
    pub fn of(values: Vec<T>) -> Self {
        Source::new(move |observer: Observer<T>| {
            for value in &values {
                observer(Emission::Next(value.clone()));
            }
            Subscription::empty()
        })
    }

    pub fn start_with(&self, value: T) -> Source<T> {
        let upstream = self.clone();
        Source::new(move |observer: Observer<T>| {
            observer(Emission::Next(value.clone()));
            upstream.subscribe_with(observer)
        })
    }

    /// Multicast with ref-counted connection.
    ///
    /// The first subscriber connects upstream; the last one to leave
    /// disconnects it. Subscribers in between share one upstream
    /// subscription and see only emissions made while they are attached.
    pub fn share(&self) -> Source<T> {
        let upstream = self.clone();
        let hub = Rc::new(ShareHub {
            subject: Subject::new(),
            connection: RefCell::new(None),
            subscribers: Cell::new(0),
        });
        Source::new(move |observer: Observer<T>| {
            let downstream = hub.subject.source().subscribe_with(observer);
            hub.subscribers.set(hub.subscribers.get() + 1);

            if hub.subscribers.get() == 1 {
                let subject = hub.subject.clone();
                let connection = upstream.subscribe(move |emission| subject.emit(emission));
                if hub.subscribers.get() == 0 {
                    // Left again during a synchronous connect.
                    connection.unsubscribe();
                } else {
                    *hub.connection.borrow_mut() = Some(connection);
                }
            }

            let hub = hub.clone();
            Subscription::new(move || {
                downstream.unsubscribe();
                let remaining = hub.subscribers.get().saturating_sub(1);
                hub.subscribers.set(remaining);
                if remaining == 0 {
                    let connection = hub.connection.borrow_mut().take();
                    if let Some(connection) = connection {
                        connection.unsubscribe();
                    }
                }
            })
        })
    }
}

struct ShareHub<T> {
    subject: Subject<T>,
    connection: RefCell<Option<Subscription>>,
    subscribers: Cell<usize>,
}

impl<T: Clone + 'static> Source<Source<T>> {
    /// Flatten by following only the most recent inner source.
    ///
    /// Each new inner source closes the previous inner subscription before
    /// the new one is opened, so nothing from a superseded inner source is
    /// delivered afterwards. The downstream subscriber is never
    /// resubscribed.
    pub fn switch_latest(&self) -> Source<T> {
        let outer = self.clone();
        Source::new(move |observer: Observer<T>| {
            let current: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
            let epoch = Rc::new(Cell::new(0u64));

            let current_for_outer = current.clone();
            let outer_subscription = outer.subscribe(move |emission| match emission {
                Emission::Next(inner) => {
                    let previous = current_for_outer.borrow_mut().take();
                    if let Some(previous) = previous {
                        previous.unsubscribe();
                    }

                    let this_epoch = epoch.get() + 1;
                    epoch.set(this_epoch);
                    let subscription = inner.subscribe_with(observer.clone());

                    // A newer inner source may have arrived while this one
                    // was connecting; it owns the slot now.
                    if epoch.get() == this_epoch {
                        *current_for_outer.borrow_mut() = Some(subscription);
                    } else {
                        subscription.unsubscribe();
                    }
                }
                Emission::Error(err) => observer(Emission::Error(err)),
            });

            Subscription::new(move || {
                outer_subscription.unsubscribe();
                let inner = current.borrow_mut().take();
                if let Some(inner) = inner {
                    inner.unsubscribe();
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CycleError;
    use crate::stream::Latest;

    fn collect<T: 'static>(source: &Source<T>) -> (Rc<RefCell<Vec<T>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let sub = source.on_next(move |v| seen_clone.borrow_mut().push(v));
        (seen, sub)
    }

    #[test]
    fn test_map_filter_chain() {
        let subject = Subject::new();
        let source = subject.source().filter(|v: &i32| v % 2 == 0).map(|v| v * 10);
        let (seen, _sub) = collect(&source);

        for v in 1..=4 {
            subject.next(v);
        }
        assert_eq!(*seen.borrow(), vec![20, 40]);
    }

    #[test]
    fn test_filter_map_drops_none() {
        let subject = Subject::new();
        let (seen, _sub) = collect(&subject.source().filter_map(|v: Option<&'static str>| v));

        subject.next(None);
        subject.next(Some("a"));
        subject.next(None);
        assert_eq!(*seen.borrow(), vec!["a"]);
    }

    #[test]
    fn test_merge_interleaves_in_arrival_order() {
        let a = Subject::new();
        let b = Subject::new();
        let (seen, _sub) = collect(&Source::merge(vec![a.source(), b.source()]));

        a.next("a1");
        b.next("b1");
        a.next("a2");
        assert_eq!(*seen.borrow(), vec!["a1", "b1", "a2"]);
    }

    #[test]
    fn test_merge_fan_out_follows_list_order() {
        let subject = Subject::new();
        let first = subject.source().map(|v: i32| ("first", v));
        let second = subject.source().map(|v: i32| ("second", v));
        let (seen, _sub) = collect(&Source::merge(vec![first, second]));

        subject.next(1);
        assert_eq!(*seen.borrow(), vec![("first", 1), ("second", 1)]);
    }

    #[test]
    fn test_start_with_and_of() {
        let (seen, _sub) = collect(&Source::of(vec![2, 3]).start_with(1));
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_share_connects_once() {
        let connects = Rc::new(Cell::new(0));
        let subject = Subject::new();
        let upstream = {
            let connects = connects.clone();
            let subject = subject.clone();
            Source::new(move |observer| {
                connects.set(connects.get() + 1);
                subject.source().subscribe_with(observer)
            })
        };
        let shared = upstream.share();

        let (a, sub_a) = collect(&shared);
        let (b, sub_b) = collect(&shared);
        subject.next(7);

        assert_eq!(connects.get(), 1);
        assert_eq!(*a.borrow(), vec![7]);
        assert_eq!(*b.borrow(), vec![7]);

        sub_a.unsubscribe();
        sub_b.unsubscribe();
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn test_switch_latest_drops_superseded_inner() {
        let first = Subject::new();
        let second = Subject::new();
        let outer = Latest::new(first.source());
        let (seen, _sub) = collect(&outer.source().switch_latest());

        first.next(1);
        outer.next(second.source());
        first.next(2);
        second.next(3);

        assert_eq!(*seen.borrow(), vec![1, 3]);
        assert_eq!(first.observer_count(), 0);
    }

    #[test]
    fn test_errors_pass_through_operators() {
        let subject: Subject<i32> = Subject::new();
        let errors = Rc::new(Cell::new(0));
        let errors_clone = errors.clone();
        let _sub = subject.source().map(|v| v + 1).filter(|_| true).subscribe(move |e| {
            if let Emission::Error(_) = e {
                errors_clone.set(errors_clone.get() + 1);
            }
        });

        subject.error(CycleError::SourceNameCollision { name: "x".into() });
        assert_eq!(errors.get(), 1);
    }
}
