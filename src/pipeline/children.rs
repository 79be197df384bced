//! Children aggregator - dynamic union of descendant action buses.
//!
//! The aggregator holds its current member set as one merged source inside
//! a [`Latest`]. Its output is `switch_latest(members).share()`: when the
//! membership changes, only the internal inner subscription is replaced.
//! Downstream subscribers stay attached and simply start seeing the new
//! members' future actions. A removed member stops contributing; nothing it
//! emitted before a member was added is replayed.

use tracing::debug;

use crate::stream::{Latest, Source};
use crate::types::{Action, NodeId};

#[derive(Clone)]
pub struct Aggregator {
    members: Latest<Source<Action>>,
    output: Source<Action>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        let members = Latest::new(Source::empty());
        let output = members.source().switch_latest().share();
        Self { members, output }
    }

    /// Replace the member set.
    pub fn recompute(&self, owner: NodeId, sources: Vec<Source<Action>>) {
        debug!(node = %owner, members = sources.len(), "recomputing children actions");
        self.members.next(Source::merge(sources));
    }

    /// The aggregated stream. Always the same shared instance.
    pub fn output(&self) -> Source<Action> {
        self.output.clone()
    }
}
