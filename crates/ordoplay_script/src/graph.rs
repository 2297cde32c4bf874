// SPDX-License-Identifier: MIT OR Apache-2.0
//! Named graphs: views that group an orchestration's nodes.

use crate::flags::GraphFlags;
use crate::node::NodeId;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// A named group of nodes inside an orchestration.
///
/// Graphs hold node ids only; the orchestration owns the nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptGraph {
    name: String,
    flags: GraphFlags,
    nodes: IndexSet<NodeId>,
}

impl ScriptGraph {
    /// Create an empty graph
    pub fn new(name: impl Into<String>, flags: GraphFlags) -> Self {
        Self {
            name: name.into(),
            flags,
            nodes: IndexSet::new(),
        }
    }

    /// Graph name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Graph flags
    pub fn flags(&self) -> GraphFlags {
        self.flags
    }

    /// Whether this is an event graph
    pub fn is_event_graph(&self) -> bool {
        self.flags.contains(GraphFlags::EVENT)
    }

    /// Whether this is a function graph
    pub fn is_function_graph(&self) -> bool {
        self.flags.contains(GraphFlags::FUNCTION)
    }

    /// Node ids in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    /// Check membership
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains(&node_id)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn insert(&mut self, node_id: NodeId) -> bool {
        self.nodes.insert(node_id)
    }

    pub(crate) fn remove(&mut self, node_id: NodeId) -> bool {
        self.nodes.shift_remove(&node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_keeps_order() {
        let mut graph = ScriptGraph::new("EventGraph", GraphFlags::EVENT | GraphFlags::EDITABLE);
        assert!(graph.insert(NodeId(3)));
        assert!(graph.insert(NodeId(1)));
        assert!(!graph.insert(NodeId(3)));

        assert_eq!(graph.nodes().collect::<Vec<_>>(), [NodeId(3), NodeId(1)]);
        assert!(graph.is_event_graph());
        assert!(!graph.is_function_graph());

        assert!(graph.remove(NodeId(3)));
        assert!(!graph.contains(NodeId(3)));
        assert_eq!(graph.len(), 1);
    }
}
