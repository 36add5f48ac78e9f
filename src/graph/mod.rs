// src/graph/mod.rs
pub mod components;
pub mod edge;
pub mod graph;
pub mod node;

pub use components::Components;
pub use edge::Edge;
pub use graph::{Graph, DEFAULT_MAX_ITERATIONS, FAIL_GRAPH_NAME};
pub use node::{Node, NodeId};
