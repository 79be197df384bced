//! # spark-cycle
//!
//! Stream-driven state for trees of UI components.
//!
//! Each component node owns a private state machine fed by two kinds of push
//! sources: actions it declares, and UI events coming from the host's
//! rendered elements. Actions also flow up the tree, so a parent can react to
//! anything its descendants emit.
//!
//! ## Architecture
//!
//! ```text
//! host events ─→ EventTable ─┐
//!                            ├─→ reducers ─→ fold ─→ state ─→ view ─→ host elements
//! declared actions ─→ bus ───┤
//!                            └─→ parent's childrenActions ─→ ...
//! ```
//!
//! Nodes live in a per-[`Tree`] arena addressed by generational [`NodeId`]s.
//! Everything is single-threaded and synchronous: an emission is handled on
//! the call stack of whoever produced it.
//!
//! ## Modules
//!
//! - [`stream`] - Minimal push sources (`Source`, `Subject`, `Latest`, `share`, `switch_latest`)
//! - [`dom`] - Host elements, events and the event multiplexer
//! - [`pipeline`] - Action bus, reducer fold, children aggregator, lifecycle transitions
//! - [`engine`] - Definitions, sources, node registry, the tree and its events
//! - [`view`] - Views, the element builder and a reference host
//! - [`config`] - Tree configuration
//!
//! ## Example
//!
//! ```ignore
//! use spark_cycle::{create_tree, Definition, Host, Props, Reducer};
//!
//! let counter = Definition::new("Counter", 0i64, |count, _, ui| {
//!     Ok(ui.element("div").child(
//!         ui.element("button").class("inc").child(ui.text(count.to_string())),
//!     ))
//! })
//! .reducers(|sources, _| {
//!     vec![sources
//!         .select(".inc")
//!         .events("click")
//!         .reducer(Reducer::new("increment", |count, _| count + 1))]
//! })
//! .build();
//!
//! let tree = create_tree();
//! let root = tree.create_root(&counter, Props::new())?;
//! let mut host = Host::new(tree, root);
//! let element = host.render()?;
//! ```

pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod stream;
pub mod types;
pub mod view;

pub use types::*;

pub use config::TreeConfig;
pub use dom::{DomEvent, DomSource, Element, ElementRef, EventData, EventTable};
pub use engine::{
    create_tree, Accessors, ComponentStructure, Definition, EventMask, ListenerId, PropReader,
    Sources, StateReader, Tree, TreeEvent, UpdateContext,
};
pub use error::{ConfigError, CycleError, Result};
pub use pipeline::{ActionBus, Aggregator, Reducer, ReducerCall, StateChange, SET_STATE};
pub use stream::{DisposeBag, Emission, Latest, Source, Subject, Subscription};
pub use view::{ElementBuilder, Host, View};
