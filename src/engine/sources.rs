//! The sources object handed to a component's factories.
//!
//! - `dom()` / `select()` - multiplexed host events
//! - `actions()` - the node's own action bus
//! - `children_actions()` - aggregated descendant actions
//! - `get()` / `set()` - application-supplied named sources, passed through as is

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::dom::{DomSource, Selection};
use crate::error::{CycleError, Result};
use crate::stream::Source;
use crate::types::Action;

/// Names owned by the engine.
pub const RESERVED_SOURCES: [&str; 3] = ["DOM", "actions", "childrenActions"];

#[derive(Clone)]
pub struct Sources {
    dom: DomSource,
    actions: Source<Action>,
    children_actions: Source<Action>,
    extra: Rc<RefCell<BTreeMap<String, Rc<dyn Any>>>>,
}

impl Sources {
    pub(crate) fn new(
        dom: DomSource,
        actions: Source<Action>,
        children_actions: Source<Action>,
    ) -> Self {
        Self {
            dom,
            actions,
            children_actions,
            extra: Rc::new(RefCell::new(BTreeMap::new())),
        }
    }

    pub fn dom(&self) -> &DomSource {
        &self.dom
    }

    /// Shortcut for `dom().select(selector)`.
    pub fn select(&self, selector: &str) -> Selection {
        self.dom.select(selector)
    }

    pub fn actions(&self) -> Source<Action> {
        self.actions.clone()
    }

    pub fn children_actions(&self) -> Source<Action> {
        self.children_actions.clone()
    }

    /// Application source registered under `name`, if it has type `Source<T>`.
    pub fn get<T: 'static>(&self, name: &str) -> Option<Source<T>> {
        self.extra
            .borrow()
            .get(name)
            .and_then(|source| source.downcast_ref::<Source<T>>())
            .cloned()
    }

    /// Register an application source.
    ///
    /// Fails with `SourceNameCollision` when `name` is reserved or taken.
    pub fn set<T: 'static>(&self, name: &str, source: Source<T>) -> Result<()> {
        let mut extra = self.extra.borrow_mut();
        if RESERVED_SOURCES.contains(&name) || extra.contains_key(name) {
            return Err(CycleError::SourceNameCollision {
                name: name.to_string(),
            });
        }
        extra.insert(name.to_string(), Rc::new(source));
        Ok(())
    }

    pub fn names(&self) -> Vec<String> {
        self.extra.borrow().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::EventTable;
    use crate::stream::Subject;

    fn sources() -> Sources {
        Sources::new(DomSource::new(EventTable::new()), Source::empty(), Source::empty())
    }

    #[test]
    fn test_set_and_get_typed() {
        let sources = sources();
        let ticks: Subject<u64> = Subject::new();
        sources.set("ticks", ticks.source()).expect("fresh name");

        assert!(sources.get::<u64>("ticks").is_some());
        assert!(sources.get::<String>("ticks").is_none());
        assert!(sources.get::<u64>("missing").is_none());
        assert_eq!(sources.names(), vec!["ticks".to_string()]);
    }

    #[test]
    fn test_name_collisions() {
        let sources = sources();
        sources.set("ticks", Source::<u64>::empty()).expect("fresh name");

        let duplicate = sources.set("ticks", Source::<u64>::empty());
        assert_eq!(
            duplicate,
            Err(CycleError::SourceNameCollision { name: "ticks".into() })
        );
        assert!(sources.set("actions", Source::<Action>::empty()).is_err());
    }
}
