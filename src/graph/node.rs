// src/graph/node.rs
use crate::utils::Point2D;

pub type NodeId = i32;

pub const DEFAULT_NODE_TYPE: &str = "room";
pub const DEFAULT_NODE_LABEL: char = ' ';

/// A typed graph vertex. Identity is the `id`; label, type and position are
/// metadata. Positions are only meaningful once the node is committed to a
/// [`crate::graph::Graph`].
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub label: char,
    pub node_type: String,
    pub pos: Point2D,
}

impl Node {
    pub fn new(id: NodeId, label: char, node_type: impl Into<String>) -> Self {
        Node {
            id,
            label,
            node_type: node_type.into(),
            pos: Point2D::default(),
        }
    }

    /// A default-labelled `"room"` node.
    pub fn room(id: NodeId) -> Self {
        Node::new(id, DEFAULT_NODE_LABEL, DEFAULT_NODE_TYPE)
    }

    pub fn same_id(&self, other: &Node) -> bool {
        self.id == other.id
    }

    pub fn is_type(&self, node_type: &str) -> bool {
        self.node_type == node_type
    }
}
