//! Core types shared across the engine.
//!
//! - [`NodeId`] - Stable arena address of a component node
//! - [`DefinitionId`] - Identity of a component definition
//! - [`Props`] - Host-supplied properties, including the optional key
//! - [`Action`] - Opaque tagged value flowing through action buses
//! - [`Phase`] - Lifecycle phase of a node

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Identity
// =============================================================================

/// Arena address of a node.
///
/// The index is recycled through a free pool once a node is released; the
/// generation stamp makes ids held across a release fail lookups instead of
/// resolving to the index's new occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    pub index: u32,
    pub generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}v{}", self.index, self.generation)
    }
}

/// Identity of a definition (pointer address of its `Rc`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefinitionId(pub(crate) usize);

/// Child key supplied through [`Props::key`].
pub type Key = String;

// =============================================================================
// Props
// =============================================================================

/// Properties handed to a component by its parent view.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Props {
    #[serde(default)]
    key: Option<Key>,
    #[serde(default, flatten)]
    values: BTreeMap<String, Value>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key used to tell sibling instances of one definition apart.
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Add a named value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get_key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }
}

// =============================================================================
// Action
// =============================================================================

/// A tagged value driving reducers.
///
/// `kind` is the tag matched by [`Source::filter_by_type`](crate::stream::Source::filter_by_type);
/// `payload` is free-form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Value::Null,
        }
    }

    pub fn with_payload(kind: impl Into<String>, payload: impl Into<Value>) -> Self {
        Self {
            kind: kind.into(),
            payload: payload.into(),
        }
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    pub fn payload_str(&self) -> Option<&str> {
        self.payload.as_str()
    }

    pub fn payload_u64(&self) -> Option<u64> {
        self.payload.as_u64()
    }

    /// Look up a field of an object payload.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }
}

// =============================================================================
// Lifecycle phase
// =============================================================================

/// Node lifecycle: `Uninitialized -> Mounted -> Unmounted`.
///
/// Updates happen while `Mounted` and do not change the phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Uninitialized,
    Mounted,
    Unmounted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Mounted => "mounted",
            Phase::Unmounted => "unmounted",
        };
        f.write_str(name)
    }
}
