//! Reactive pipeline - how actions turn into state.
//!
//! ```text
//! declared actions ─→ ActionBus ─┬─→ reducers ─→ fold ─→ host-visible state
//!                                └─→ parent's Aggregator ─→ parent's childrenActions
//! ```
//!
//! - [`actions`] - Per-node action bus and reducer helpers
//! - [`state`] - Sequential reducer fold with fail-fast errors
//! - [`children`] - Dynamic union of descendant action buses
//! - [`mount`] - Mount, update and unmount transitions on [`Tree`](crate::engine::Tree)

pub mod actions;
pub mod children;
pub mod mount;
pub mod state;

pub use actions::{build_action_stream, ActionBus};
pub use children::Aggregator;
pub use state::{build_state_stream, Reducer, ReducerCall, StateChange, SET_STATE};
