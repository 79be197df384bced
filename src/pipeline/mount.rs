//! Lifecycle Coordinator - mount, update and unmount transitions.
//!
//! ```text
//! Uninitialized ──mount──→ Mounted ──unmount──→ Unmounted (slot released)
//!                            │  ↑
//!                            └update
//! ```
//!
//! # Mount order
//!
//! 1. Bind the event multiplexer to the rendered element
//! 2. Feed the declared action sources into the bus
//! 3. Tap the bus for `Action` tree events
//! 4. Subscribe host-visible state to the reducer pipeline
//! 5. Recompute the children aggregators up to the root
//! 6. Run `on_mount`
//!
//! Every subscription taken here lands in the node's dispose bag and is
//! released by `unmount`.

use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::dom::ElementRef;
use crate::engine::{NodeCore, Tree, TreeEvent};
use crate::error::{CycleError, Result};
use crate::stream::Subscription;
use crate::types::{NodeId, Phase, Props};

impl Tree {
    /// Mount `node` onto its first rendered element.
    pub fn mount(&self, node: NodeId, element: &ElementRef) -> Result<()> {
        let (core, behavior) = self.parts(node)?;
        let from = core.phase.get();
        if from != Phase::Uninitialized {
            return Err(CycleError::InvalidTransition {
                name: core.name.to_string(),
                from,
                to: Phase::Mounted,
            });
        }
        core.phase.set(Phase::Mounted);

        *core.element.borrow_mut() = Some(element.clone());
        core.events.rebind(element);

        let mut started = Vec::new();
        if let Some(actions) = behavior.start_actions(&core) {
            started.push(actions);
        }
        started.push(self.action_tap(&core));
        started.push(behavior.start_state(&core));
        {
            let mut bag = core.subscriptions.borrow_mut();
            for subscription in started {
                bag.add(subscription);
            }
        }

        self.update_children_actions(node)?;
        behavior.did_mount(&core);

        debug!(tree = %self.config().label, node = %node, component = %core.name, "component mounted");
        self.emit(&TreeEvent::ComponentMount { node });
        Ok(())
    }

    /// Re-bind a mounted node to a freshly rendered element.
    pub fn update(&self, node: NodeId, element: &ElementRef) -> Result<()> {
        let (core, behavior) = self.parts(node)?;
        let from = core.phase.get();
        if from != Phase::Mounted {
            return Err(CycleError::InvalidTransition {
                name: core.name.to_string(),
                from,
                to: Phase::Mounted,
            });
        }

        *core.element.borrow_mut() = Some(element.clone());
        core.events.rebind(element);
        behavior.did_update(&core, element);

        let action = behavior.last_action().map(|(_, action)| action);
        self.emit(&TreeEvent::ComponentUpdate { node, action });
        Ok(())
    }

    /// Ask the definition's veto hook whether `node` should re-render.
    ///
    /// Compares the node's current props and state with the ones it was
    /// last mounted or updated with. Nodes without a hook always update.
    pub fn should_update(&self, node: NodeId) -> Result<bool> {
        let (core, behavior) = self.parts(node)?;
        Ok(behavior.should_update(&core))
    }

    /// Hand new props to an existing node.
    pub fn receive_props(&self, node: NodeId, props: Props) -> Result<()> {
        let (core, _) = self.parts(node)?;
        *core.props.borrow_mut() = props;
        Ok(())
    }

    /// Tear `node` down and release its slot.
    ///
    /// Children still registered are unmounted first when the tree guards
    /// stale children; otherwise the call fails with `ChildrenStillMounted`.
    /// A node that never mounted may be discarded the same way.
    pub fn unmount(&self, node: NodeId) -> Result<()> {
        let (core, behavior) = self.parts(node)?;
        let from = core.phase.get();
        if from == Phase::Unmounted {
            return Err(CycleError::InvalidTransition {
                name: core.name.to_string(),
                from,
                to: Phase::Unmounted,
            });
        }

        let children = self.children(node)?;
        if !children.is_empty() {
            if !self.config().guard_stale_children {
                return Err(CycleError::ChildrenStillMounted {
                    name: core.name.to_string(),
                    count: children.len(),
                });
            }
            warn!(node = %node, component = %core.name, count = children.len(), "unmounting stale children");
            for child in children.into_iter().rev() {
                self.unmount(child)?;
            }
        }

        core.phase.set(Phase::Unmounted);
        let mut bag = std::mem::take(&mut *core.subscriptions.borrow_mut());
        bag.dispose();
        *core.element.borrow_mut() = None;

        if from == Phase::Mounted {
            behavior.will_unmount();
        }

        core.events.unbind();
        self.remove(node)?;
        self.release(node);

        debug!(tree = %self.config().label, node = %node, component = %core.name, "component unmounted");
        self.emit(&TreeEvent::ComponentUnmount { node });
        Ok(())
    }

    fn action_tap(&self, core: &Rc<NodeCore>) -> Subscription {
        let tree = Rc::downgrade(&self.inner);
        let trace_actions = self.config().trace_actions;
        let node = core.id;
        let name = core.name.clone();
        core.bus.source().on_next(move |action| {
            if trace_actions {
                trace!(node = %node, component = %name, kind = %action.kind, "action");
            }
            if let Some(inner) = tree.upgrade() {
                inner.listeners.emit(&TreeEvent::Action { node, action });
            }
        })
    }
}
