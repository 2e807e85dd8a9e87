//! Per-node expansion state.
//!
//! A node's edges are materialized when the node is expanded or when
//! expand-all is on. Nodes only collapse on an explicit toggle.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilitySet {
    expanded: HashSet<String>,
    expand_all: bool,
}

impl Default for VisibilitySet {
    /// Expand-all is on unless a caller narrows it.
    fn default() -> Self {
        Self {
            expanded: HashSet::new(),
            expand_all: true,
        }
    }
}

impl VisibilitySet {
    /// Per-node mode with nothing expanded.
    pub fn narrowed() -> Self {
        Self {
            expanded: HashSet::new(),
            expand_all: false,
        }
    }

    pub fn is_expand_all(&self) -> bool {
        self.expand_all
    }

    pub fn is_expanded(&self, node_id: &str) -> bool {
        self.expand_all || self.expanded.contains(node_id)
    }

    /// Flip a node between collapsed and expanded. Returns the new state.
    ///
    /// Collapsing while expand-all is on narrows to per-node mode with every
    /// other previously expanded node kept.
    pub fn toggle(&mut self, node_id: &str) -> bool {
        if self.expand_all {
            self.expand_all = false;
            self.expanded.remove(node_id);
            return false;
        }
        if self.expanded.remove(node_id) {
            false
        } else {
            self.expanded.insert(node_id.to_string());
            true
        }
    }

    pub fn expand(&mut self, node_id: &str) {
        self.expanded.insert(node_id.to_string());
    }

    pub fn expand_all(&mut self) {
        self.expand_all = true;
    }

    /// Collapse everything and leave expand-all off.
    pub fn collapse_all(&mut self) {
        self.expand_all = false;
        self.expanded.clear();
    }
}
