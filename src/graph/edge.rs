// src/graph/edge.rs
use crate::graph::{Node, NodeId};

pub const DEFAULT_EDGE_TYPE: &str = "default";

/// A directed, typed edge holding copies of both endpoints.
///
/// Edges carry no id of their own: two edges are the same edge when their
/// source and target ids match (see [`Edge::key`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub src: Node,
    pub target: Node,
    pub edge_type: String,
    /// Set on edges produced by id regeneration rather than by an author.
    pub auto_id: bool,
}

impl Edge {
    pub fn new(src: Node, target: Node) -> Self {
        Self::with_type(src, target, DEFAULT_EDGE_TYPE)
    }

    pub fn with_type(src: Node, target: Node, edge_type: impl Into<String>) -> Self {
        Edge {
            src,
            target,
            edge_type: edge_type.into(),
            auto_id: false,
        }
    }

    pub fn key(&self) -> (NodeId, NodeId) {
        (self.src.id, self.target.id)
    }

    pub fn touches(&self, id: NodeId) -> bool {
        self.src.id == id || self.target.id == id
    }
}
