//! Error types for the component engine.
//!
//! Every violation is raised synchronously at the point it happens. Errors
//! are `Clone` so a reducer failure can travel through a shared state
//! sequence to every observer.

use thiserror::Error;

use crate::types::{Key, NodeId, Phase};

/// Errors raised by tree construction, lifecycle transitions and reducers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CycleError {
    /// A definition was instantiated twice under one parent with the same key
    /// (or twice without a key).
    #[error("{}", duplicate_key_message(.name, .key))]
    DuplicateKey { name: String, key: Option<Key> },

    /// A second parentless node was requested while a root is live.
    #[error("cannot create root component '{name}': the tree already has a root")]
    RootAlreadyExists { name: String },

    /// A named source is already present on the node's sources object.
    #[error("could not set component source: '{name}' is already defined")]
    SourceNameCollision { name: String },

    /// A reducer returned an error; the node's state sequence is terminated.
    #[error("reducer '{reducer}' of component '{component}' failed: {message}")]
    ReducerFailure {
        component: String,
        reducer: String,
        message: String,
    },

    /// The id does not address a live node.
    #[error("node {0} is not part of the tree")]
    UnknownNode(NodeId),

    /// Typed state access used a type other than the definition's state type.
    #[error("component '{name}' does not hold state of type {expected}")]
    StateTypeMismatch { name: String, expected: &'static str },

    /// A lifecycle call arrived in the wrong phase.
    #[error("component '{name}' cannot go from {from} to {to}")]
    InvalidTransition { name: String, from: Phase, to: Phase },

    /// A parent was unmounted while children were still registered.
    #[error("component '{name}' still has {count} mounted children")]
    ChildrenStillMounted { name: String, count: usize },
}

fn duplicate_key_message(name: &str, key: &Option<Key>) -> String {
    match key {
        None => format!(
            "component '{name}' rendered multiple times without the key property"
        ),
        Some(key) => format!(
            "component '{name}' rendered multiple times with the same key property '{key}'"
        ),
    }
}

/// Errors raised while loading a [`TreeConfig`](crate::config::TreeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid tree config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T, E = CycleError> = std::result::Result<T, E>;
