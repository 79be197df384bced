//! Component engine - definitions, node identity and the tree.
//!
//! - [`definition`] - Immutable component recipes and the accessors handed to their factories
//! - [`sources`] - The per-node sources object (`DOM`, `actions`, `childrenActions`, named sources)
//! - [`registry`] - Generational arena and keyed child registries
//! - [`node`] - Per-node reactive core and typed instance
//! - [`events`] - Tree event masks and listeners
//! - [`tree`] - The [`Tree`] object and its accessors
//!
//! # Architecture
//!
//! ```text
//! Tree ── Arena<NodeRecord> ── NodeRecord { parent: NodeId, children: ChildRegistry,
//!                                           core: NodeCore, behavior: Instance<S> }
//! ```
//!
//! Parents own children through the registry. Children hold their parent's
//! id only, used for upward notification and self-removal.

pub mod definition;
pub mod events;
mod node;
mod registry;
pub mod sources;
mod tree;

pub use definition::{Accessors, Definition, PropReader, StateReader, UpdateContext};
pub use events::{EventMask, ListenerId, TreeEvent};
pub(crate) use node::NodeCore;
pub use sources::{Sources, RESERVED_SOURCES};
pub use tree::{create_tree, ComponentStructure, Tree};
