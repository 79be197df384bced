//! Event multiplexer - hot-swappable event sources per (selector, event).
//!
//! A component asks for `select(selector).events(name)` once, typically in
//! its reducers factory, long before anything is rendered. The returned
//! source is stable: it is allocated lazily on first request and every later
//! request returns the same shared instance.
//!
//! After each host render, [`EventTable::rebind`] resolves every registered
//! selector under the node's freshly rendered root and redirects the entry to
//! the new element. The table keeps that root, so entries first requested
//! after a rebind start on the matching element right away. Redirection happens beneath the subscribers through
//! `switch_latest`, so they are never resubscribed and never see events from
//! a previous element.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::stream::{Latest, Source};

use super::element::ElementRef;
use super::event::DomEvent;

struct Entry {
    target: Latest<Source<DomEvent>>,
    output: Source<DomEvent>,
}

/// Per-node table of multiplexed event sources.
#[derive(Clone, Default)]
pub struct EventTable {
    entries: Rc<RefCell<BTreeMap<(String, String), Entry>>>,
    bound: Rc<RefCell<Option<ElementRef>>>,
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stable source for `(selector, event)`.
    pub fn source(&self, selector: &str, event: &str) -> Source<DomEvent> {
        let key = (selector.to_string(), event.to_string());
        if let Some(entry) = self.entries.borrow().get(&key) {
            return entry.output.clone();
        }

        let initial = self.resolve(selector, event);
        let target = Latest::new(initial);
        let output = target.source().switch_latest().share();
        self.entries.borrow_mut().insert(
            key,
            Entry {
                target,
                output: output.clone(),
            },
        );
        output
    }

    /// Point every entry at the matching descendant of `root`.
    ///
    /// Entries whose selector matches nothing go quiet until a later rebind
    /// finds an element.
    pub fn rebind(&self, root: &ElementRef) {
        *self.bound.borrow_mut() = Some(root.clone());

        // Collect first: switching may run subscriber code that asks for
        // new entries.
        let targets: Vec<(Latest<Source<DomEvent>>, Source<DomEvent>)> = self
            .entries
            .borrow()
            .iter()
            .map(|((selector, event), entry)| {
                (entry.target.clone(), self.resolve(selector, event))
            })
            .collect();

        for (target, source) in targets {
            target.next(source);
        }
    }

    /// Forget the bound root and silence every entry.
    pub fn unbind(&self) {
        self.bound.borrow_mut().take();
        let targets: Vec<Latest<Source<DomEvent>>> = self
            .entries
            .borrow()
            .values()
            .map(|entry| entry.target.clone())
            .collect();
        for target in targets {
            target.next(Source::empty());
        }
    }

    fn resolve(&self, selector: &str, event: &str) -> Source<DomEvent> {
        self.bound
            .borrow()
            .as_ref()
            .and_then(|root| root.query_selector(selector))
            .map(|element| element.events(event))
            .unwrap_or_else(Source::empty)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

/// `DOM` entry of a node's sources: `dom.select(selector).events(name)`.
#[derive(Clone)]
pub struct DomSource {
    table: EventTable,
}

impl DomSource {
    pub fn new(table: EventTable) -> Self {
        Self { table }
    }

    pub fn select(&self, selector: &str) -> Selection {
        Selection {
            table: self.table.clone(),
            selector: selector.to_string(),
        }
    }
}

/// A selector awaiting an event name.
pub struct Selection {
    table: EventTable,
    selector: String,
}

impl Selection {
    pub fn events(&self, event: &str) -> Source<DomEvent> {
        self.table.source(&self.selector, event)
    }
}
