//! Push sources - the minimal synchronous stream layer the engine composes.
//!
//! A [`Source`] is a cold, cloneable description of a push sequence.
//! Subscribing connects an observer and returns a [`Subscription`]; every
//! emission is delivered synchronously on the call stack of whoever produced
//! it. There is no scheduler.
//!
//! # Operators
//!
//! Only what the engine needs:
//! - [`Source::map`], [`Source::filter`], [`Source::filter_map`], [`Source::tap`]
//! - [`Source::merge`] - ordered union, arrival order preserved
//! - [`Source::start_with`] - seed emission on subscribe
//! - [`Source::share`] - ref-counted multicast
//! - [`Source::switch_latest`] - flatten a source of sources, following the
//!   most recent inner source only
//!
//! Multicast entry points are [`Subject`] and [`Latest`] (replays its current
//! value to new subscribers).

mod ops;
mod subject;

pub use subject::{Latest, Subject};

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::CycleError;

// =============================================================================
// Emission / Observer
// =============================================================================

/// One notification pushed to an observer.
#[derive(Clone, Debug, PartialEq)]
pub enum Emission<T> {
    Next(T),
    Error(CycleError),
}

/// Callback receiving emissions.
pub type Observer<T> = Rc<dyn Fn(Emission<T>)>;

// =============================================================================
// Subscription
// =============================================================================

/// Handle to a live connection between a source and an observer.
///
/// Cloning shares the handle; `unsubscribe` runs the teardown at most once.
#[derive(Clone)]
pub struct Subscription {
    inner: Rc<SubscriptionInner>,
}

struct SubscriptionInner {
    closed: Cell<bool>,
    teardown: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Subscription {
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            inner: Rc::new(SubscriptionInner {
                closed: Cell::new(false),
                teardown: RefCell::new(Some(Box::new(teardown))),
            }),
        }
    }

    /// A subscription with nothing to release.
    pub fn empty() -> Self {
        Self::new(|| {})
    }

    pub fn unsubscribe(&self) {
        if self.inner.closed.replace(true) {
            return;
        }
        let teardown = self.inner.teardown.borrow_mut().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Owns a set of subscriptions and releases them together.
///
/// Dropping the bag releases everything still held, so an owner that exits
/// early (including by error) cannot leak its subscriptions.
#[derive(Default, Debug)]
pub struct DisposeBag {
    subscriptions: Vec<Subscription>,
}

impl DisposeBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release every held subscription, most recent first.
    pub fn dispose(&mut self) {
        while let Some(subscription) = self.subscriptions.pop() {
            subscription.unsubscribe();
        }
    }
}

impl Drop for DisposeBag {
    fn drop(&mut self) {
        self.dispose();
    }
}

// =============================================================================
// Source
// =============================================================================

/// A cold push source.
pub struct Source<T> {
    connect: Rc<dyn Fn(Observer<T>) -> Subscription>,
}

impl<T> Clone for Source<T> {
    fn clone(&self) -> Self {
        Self {
            connect: self.connect.clone(),
        }
    }
}

impl<T: 'static> Source<T> {
    /// Build a source from its connect function.
    ///
    /// `connect` is called once per subscriber and returns the teardown for
    /// that subscriber.
    pub fn new(connect: impl Fn(Observer<T>) -> Subscription + 'static) -> Self {
        Self {
            connect: Rc::new(connect),
        }
    }

    /// A source that never emits.
    pub fn empty() -> Self {
        Self::new(|_| Subscription::empty())
    }

    /// Subscribe an observer.
    ///
    /// Once the returned subscription is closed the observer is gated off:
    /// an emission already in flight (for example a multicast loop working
    /// through a snapshot of observers) is not delivered.
    pub fn subscribe_with(&self, observer: Observer<T>) -> Subscription {
        let open = Rc::new(Cell::new(true));
        let gate = open.clone();
        let gated: Observer<T> = Rc::new(move |emission| {
            if gate.get() {
                observer(emission);
            }
        });
        let upstream = (self.connect)(gated);
        Subscription::new(move || {
            open.set(false);
            upstream.unsubscribe();
        })
    }

    pub fn subscribe(&self, observer: impl Fn(Emission<T>) + 'static) -> Subscription {
        self.subscribe_with(Rc::new(observer))
    }

    /// Subscribe to values only; errors are dropped by this observer.
    pub fn on_next(&self, observer: impl Fn(T) + 'static) -> Subscription {
        self.subscribe(move |emission| {
            if let Emission::Next(value) = emission {
                observer(value);
            }
        })
    }

    /// True when both handles describe the same source instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.connect, &other.connect)
    }
}
