//! Node Registry - arena allocation and keyed child registries.
//!
//! Manages the lifecycle of node slots:
//! - Generational ids so a released id never resolves to a later occupant
//! - Free index pool for O(1) reuse
//! - Per-parent child registry keyed by (definition, key), in insertion order
//!
//! Parents own their children through the registry; a child refers back to
//! its parent only by id.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::types::{DefinitionId, Key, NodeId};

use super::node::{NodeBehavior, NodeCore};

// =============================================================================
// Child registry
// =============================================================================

/// Identity of a child under one parent.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ChildKey {
    pub definition: DefinitionId,
    pub key: Option<Key>,
}

/// Children of one node, in the order they were first registered.
#[derive(Default, Debug)]
pub(crate) struct ChildRegistry {
    by_key: IndexMap<ChildKey, NodeId>,
    key_of: HashMap<NodeId, ChildKey>,
}

impl ChildRegistry {
    pub fn get(&self, key: &ChildKey) -> Option<NodeId> {
        self.by_key.get(key).copied()
    }

    /// Register a child. Returns false if the key is already taken.
    pub fn insert(&mut self, key: ChildKey, id: NodeId) -> bool {
        if self.by_key.contains_key(&key) {
            return false;
        }
        self.key_of.insert(id, key.clone());
        self.by_key.insert(key, id);
        true
    }

    pub fn remove(&mut self, id: NodeId) -> bool {
        match self.key_of.remove(&id) {
            Some(key) => self.by_key.shift_remove(&key).is_some(),
            None => false,
        }
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.by_key.values().copied().collect()
    }
}

// =============================================================================
// Node record
// =============================================================================

pub(crate) struct NodeRecord {
    pub definition: DefinitionId,
    pub key: Option<Key>,
    pub parent: Option<NodeId>,
    pub children: ChildRegistry,
    pub core: Rc<NodeCore>,
    pub behavior: Rc<dyn NodeBehavior>,
}

// =============================================================================
// Arena
// =============================================================================

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Generational slot arena.
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_indices: Vec<u32>,
    live: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free_indices: Vec::new(),
            live: 0,
        }
    }
}

impl<T> Arena<T> {
    /// Allocate a slot, reusing a freed index when one is available.
    ///
    /// # Arguments
    /// * `build` - Builds the value from the id it will live under
    pub fn allocate(&mut self, build: impl FnOnce(NodeId) -> T) -> NodeId {
        let id = match self.free_indices.pop() {
            Some(index) => NodeId {
                index,
                generation: self.slots[index as usize].generation,
            },
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    value: None,
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        };

        self.slots[id.index as usize].value = Some(build(id));
        self.live += 1;
        id
    }

    /// Release a slot. The index returns to the pool under a new generation.
    pub fn release(&mut self, id: NodeId) -> Option<T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_indices.push(id.index);
        self.live -= 1;
        Some(value)
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.live
    }
}

// =============================================================================
// Tests
// =============================================================================
