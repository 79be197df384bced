//! Host elements, UI events and the event multiplexer.
//!
//! - [`element`] - Retained host elements with selector queries and dispatch
//! - [`event`] - `DomEvent` / `EventData` (crossterm key and mouse payloads)
//! - [`multiplexer`] - Hot-swappable `(selector, event)` sources

pub mod element;
pub mod event;
pub mod multiplexer;

pub use element::{Element, ElementRef};
pub use event::{DomEvent, EventData};
pub use multiplexer::{DomSource, EventTable, Selection};
