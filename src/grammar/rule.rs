// src/grammar/rule.rs

use std::fmt;

use crate::error::{GrammarError, Result};
use crate::graph::{Components, Edge, Node, NodeId};

/// A rewrite rule: find `left` in the graph, splice `right` in its place.
///
/// The two sides need not have the same size; that is what lets a graph
/// grow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rule {
    id: String,
    left: Components,
    right: Components,
}

impl Rule {
    pub fn new(left: Components, right: Components) -> Self {
        Rule {
            id: String::new(),
            left,
            right,
        }
    }

    pub fn with_id(id: impl Into<String>, left: Components, right: Components) -> Self {
        Rule {
            id: id.into(),
            left,
            right,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn left(&self) -> &Components {
        &self.left
    }

    pub fn right(&self) -> &Components {
        &self.right
    }

    pub fn left_mut(&mut self) -> &mut Components {
        &mut self.left
    }

    pub fn right_mut(&mut self) -> &mut Components {
        &mut self.right
    }

    pub fn set_left(&mut self, node: Node) {
        self.left.nodes.push(node);
    }

    pub fn set_lefts(&mut self, nodes: impl IntoIterator<Item = Node>) {
        self.left.nodes.extend(nodes);
    }

    pub fn set_right(&mut self, node: Node) {
        self.right.nodes.push(node);
    }

    pub fn set_rights(&mut self, nodes: impl IntoIterator<Item = Node>) {
        self.right.nodes.extend(nodes);
    }

    pub fn add_left_edge(&mut self, edge: Edge) {
        self.left.edges.push(edge);
    }

    pub fn add_left_edges(&mut self, edges: impl IntoIterator<Item = Edge>) {
        self.left.edges.extend(edges);
    }

    pub fn add_right_edge(&mut self, edge: Edge) {
        self.right.edges.push(edge);
    }

    pub fn add_right_edges(&mut self, edges: impl IntoIterator<Item = Edge>) {
        self.right.edges.extend(edges);
    }

    /// # Errors
    ///
    /// [`GrammarError::NodeNotFound`] if no right-hand node has `id`.
    pub fn right_node_at_id(&self, id: NodeId) -> Result<&Node> {
        self.right
            .node_at_id(id)
            .ok_or(GrammarError::NodeNotFound(id))
    }

    pub fn left_size(&self) -> usize {
        self.left.nodes.len()
    }

    pub fn right_size(&self) -> usize {
        self.right.nodes.len()
    }

    pub fn left_edge_size(&self) -> usize {
        self.left.edges.len()
    }

    pub fn right_edge_size(&self) -> usize {
        self.right.edges.len()
    }

    pub fn update_rule(&mut self, left: Components, right: Components) {
        self.left = left;
        self.right = right;
    }

    pub fn clear(&mut self) {
        self.left.clear();
        self.right.clear();
    }
}

fn write_side(f: &mut fmt::Formatter<'_>, side: &Components) -> fmt::Result {
    let nodes: Vec<String> = side.nodes.iter().map(|n| format!("Node{}", n.id)).collect();
    write!(f, "[{}]", nodes.join(", "))?;
    if !side.edges.is_empty() {
        let edges: Vec<String> = side
            .edges
            .iter()
            .map(|e| format!("{}---{}", e.src.id, e.target.id))
            .collect();
        write!(f, " {{{}}}", edges.join(", "))?;
    }
    Ok(())
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.id)?;
        write_side(f, &self.left)?;
        write!(f, " => ")?;
        write_side(f, &self.right)
    }
}
