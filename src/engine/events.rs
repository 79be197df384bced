//! Tree events - lifecycle notifications for tooling and tests.
//!
//! Listeners register with an [`EventMask`] and receive every [`TreeEvent`]
//! whose kind is in the mask, in registration order.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::types::{Action, NodeId};

bitflags::bitflags! {
    /// Kinds of tree events a listener is interested in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EventMask: u8 {
        /// The root node was created.
        const INITIALIZE = 1 << 0;
        /// Any node was created.
        const COMPONENT_INIT = 1 << 1;
        /// A mounted node is about to re-render.
        const WILL_UPDATE = 1 << 2;
        /// A mounted node finished an update.
        const UPDATE = 1 << 3;
        /// An action passed through a node's bus.
        const ACTION = 1 << 4;
        const MOUNT = 1 << 5;
        const UNMOUNT = 1 << 6;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TreeEvent {
    Initialize { root: NodeId },
    ComponentInit { node: NodeId, name: String },
    ComponentWillUpdate { node: NodeId },
    /// `action` is the last action folded into the node's state, if any.
    ComponentUpdate { node: NodeId, action: Option<Action> },
    Action { node: NodeId, action: Action },
    ComponentMount { node: NodeId },
    ComponentUnmount { node: NodeId },
}

impl TreeEvent {
    pub fn mask(&self) -> EventMask {
        match self {
            TreeEvent::Initialize { .. } => EventMask::INITIALIZE,
            TreeEvent::ComponentInit { .. } => EventMask::COMPONENT_INIT,
            TreeEvent::ComponentWillUpdate { .. } => EventMask::WILL_UPDATE,
            TreeEvent::ComponentUpdate { .. } => EventMask::UPDATE,
            TreeEvent::Action { .. } => EventMask::ACTION,
            TreeEvent::ComponentMount { .. } => EventMask::MOUNT,
            TreeEvent::ComponentUnmount { .. } => EventMask::UNMOUNT,
        }
    }
}

/// Handle returned by [`Tree::on`](super::Tree::on).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler = Rc<dyn Fn(&TreeEvent)>;

#[derive(Default)]
pub(crate) struct Listeners {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(ListenerId, EventMask, Handler)>>,
}

impl Listeners {
    pub fn add(&self, mask: EventMask, handler: Handler) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().push((id, mask, handler));
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(existing, _, _)| *existing != id);
        entries.len() != before
    }

    pub fn emit(&self, event: &TreeEvent) {
        let kind = event.mask();
        // Handlers may bind or unbind while being notified.
        let matching: Vec<Handler> = self
            .entries
            .borrow()
            .iter()
            .filter(|(_, mask, _)| mask.intersects(kind))
            .map(|(_, _, handler)| handler.clone())
            .collect();
        for handler in matching {
            handler(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> NodeId {
        NodeId { index: 3, generation: 0 }
    }

    #[test]
    fn test_mask_filters_events() {
        let listeners = Listeners::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        listeners.add(
            EventMask::MOUNT | EventMask::UNMOUNT,
            Rc::new(move |event| seen_clone.borrow_mut().push(event.clone())),
        );

        listeners.emit(&TreeEvent::ComponentMount { node: node() });
        listeners.emit(&TreeEvent::ComponentWillUpdate { node: node() });
        listeners.emit(&TreeEvent::ComponentUnmount { node: node() });

        assert_eq!(
            *seen.borrow(),
            vec![
                TreeEvent::ComponentMount { node: node() },
                TreeEvent::ComponentUnmount { node: node() },
            ]
        );
    }

    #[test]
    fn test_remove_stops_delivery() {
        let listeners = Listeners::default();
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        let id = listeners.add(EventMask::all(), Rc::new(move |_| count_clone.set(count_clone.get() + 1)));

        listeners.emit(&TreeEvent::Initialize { root: node() });
        assert!(listeners.remove(id));
        assert!(!listeners.remove(id));
        listeners.emit(&TreeEvent::Initialize { root: node() });

        assert_eq!(count.get(), 1);
    }
}
