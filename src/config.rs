//! Tree configuration.
//!
//! ```toml
//! label = "todo-app"
//! guard_stale_children = true
//! trace_actions = false
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings for one [`Tree`](crate::engine::Tree).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Label attached to log records emitted by this tree.
    #[serde(default = "default_label")]
    pub label: String,
    /// Unmount children still registered when their parent is torn down.
    /// When false, such an unmount fails with `ChildrenStillMounted`.
    #[serde(default = "default_guard_stale_children")]
    pub guard_stale_children: bool,
    /// Log every action flowing through a node's bus at trace level.
    #[serde(default)]
    pub trace_actions: bool,
}

fn default_label() -> String {
    "tree".to_string()
}

fn default_guard_stale_children() -> bool {
    true
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            guard_stale_children: default_guard_stale_children(),
            trace_actions: false,
        }
    }
}

impl TreeConfig {
    /// Parse a config from TOML. Missing fields take their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn guard_stale_children(mut self, enabled: bool) -> Self {
        self.guard_stale_children = enabled;
        self
    }

    pub fn trace_actions(mut self, enabled: bool) -> Self {
        self.trace_actions = enabled;
        self
    }
}
