//! Model configuration.

use serde::{Deserialize, Serialize};

use lazytree_sync::DEFAULT_MAX_ANCESTOR_DEPTH;

/// Configuration for a [`TreeModel`](crate::TreeModel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Reconcile the whole tree once at construction.
    pub initial_sync: bool,
    /// Emit a full refresh when the outermost update window closes.
    pub refresh_on_commit: bool,
    /// Bound on the ancestor walk when resolving an item to an address.
    /// Longer chains are treated as cyclic.
    pub max_ancestor_depth: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            initial_sync: true,
            refresh_on_commit: true,
            max_ancestor_depth: DEFAULT_MAX_ANCESTOR_DEPTH,
        }
    }
}
