// src/graph/components.rs
use crate::graph::{Edge, Node, NodeId};

/// An unordered bundle of nodes and edges: one side of a rule, or a
/// production about to be spliced into a graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Components {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Components {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Components { nodes, edges }
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    pub fn contains_id(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn node_at_id(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }
}
