// src/graph/graph.rs

use std::collections::{HashMap, HashSet};

use union_find::{QuickUnionUf, UnionBySize, UnionFind};

use crate::generator::GeneratorConfig;
use crate::grammar::Rule;
use crate::graph::{Edge, Node, NodeId};
use crate::utils::Point2D;

/// Name carried by the graph a failed derivation hands back.
pub const FAIL_GRAPH_NAME: &str = "FAIL";

pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// The mutable graph one derivation grows.
///
/// `Clone` is a full deep copy. The derivation loop clones the accepted graph
/// before every speculative rule application and only ever replaces it
/// wholesale, so a rejected attempt cannot leak into accepted state.
#[derive(Debug, Clone)]
pub struct Graph {
    name: String,
    nodes: Vec<Node>,
    edges: Vec<Edge>,

    /// Engine id -> authored (display) id.
    ids: Vec<(NodeId, NodeId)>,
    /// Position of every node committed by a rule application, in order.
    distances: Vec<Point2D>,

    target_size_min: usize,
    target_size_max: usize,
    target_x_dist_min: f64,
    target_x_dist_max: f64,
    target_y_dist_min: f64,
    target_y_dist_max: f64,

    updated_rule: Option<Rule>,
    rules_applied: Vec<String>,

    pub iteration: usize,
    pub max_iterations: usize,
    pub completed: bool,
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            name: String::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            ids: Vec::new(),
            distances: Vec::new(),
            target_size_min: 10,
            target_size_max: 50,
            target_x_dist_min: -1000.0,
            target_x_dist_max: 1000.0,
            target_y_dist_min: -1000.0,
            target_y_dist_max: 1000.0,
            updated_rule: None,
            rules_applied: Vec::new(),
            iteration: 0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            completed: false,
        }
    }

    /// A graph holding a single seed node, configured from `config`.
    pub fn seeded(seed: Node, config: &GeneratorConfig) -> Self {
        let mut graph = Graph::new();
        graph.apply_config(config);
        graph.add_node(seed);
        graph
    }

    /// The sentinel returned when a derivation runs out of iterations.
    pub fn failed() -> Self {
        let mut graph = Graph::new();
        graph.set_name(FAIL_GRAPH_NAME);
        graph
    }

    pub fn is_failure(&self) -> bool {
        self.name == FAIL_GRAPH_NAME
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn apply_config(&mut self, config: &GeneratorConfig) {
        self.target_size_min = config.target_size_min;
        self.target_size_max = config.target_size_max;
        self.target_x_dist_min = config.target_x_dist_min;
        self.target_x_dist_max = config.target_x_dist_max;
        self.target_y_dist_min = config.target_y_dist_min;
        self.target_y_dist_max = config.target_y_dist_max;
        self.max_iterations = config.max_iterations;
    }

    // --- Storage ---

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    /// Removes every node whose id matches one of `to_remove`.
    pub fn del_nodes(&mut self, to_remove: &[Node]) {
        let ids: HashSet<NodeId> = to_remove.iter().map(|n| n.id).collect();
        self.nodes.retain(|n| !ids.contains(&n.id));
    }

    /// Removes every edge structurally equal (same source and target ids) to
    /// one of `to_remove`.
    pub fn del_edges(&mut self, to_remove: &[Edge]) {
        let keys: HashSet<(NodeId, NodeId)> = to_remove.iter().map(Edge::key).collect();
        self.edges.retain(|e| !keys.contains(&e.key()));
    }

    /// Edges with an endpoint that is no longer in the node list.
    pub fn dangling_edges(&self) -> Vec<Edge> {
        let present: HashSet<NodeId> = self.nodes.iter().map(|n| n.id).collect();
        self.edges
            .iter()
            .filter(|e| !present.contains(&e.src.id) || !present.contains(&e.target.id))
            .cloned()
            .collect()
    }

    /// Prunes dangling edges and returns how many were removed.
    pub fn remove_dangling_edges(&mut self) -> usize {
        let dangling = self.dangling_edges();
        if !dangling.is_empty() {
            self.del_edges(&dangling);
        }
        dangling.len()
    }

    pub fn clear_graph(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    // --- Queries ---

    pub fn connected_edges(&self, node: &Node) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.touches(node.id)).collect()
    }

    /// True if some edge already terminates at `node`.
    pub fn has_source(&self, node: &Node) -> bool {
        self.edges.iter().any(|e| e.target.id == node.id)
    }

    /// True if some edge already starts at `node`.
    pub fn has_target(&self, node: &Node) -> bool {
        self.edges.iter().any(|e| e.src.id == node.id)
    }

    pub fn contains_node(&self, node: &Node) -> bool {
        self.contains_id(node.id)
    }

    pub fn contains_id(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn node_at_id(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_with_label(&self, label: char) -> Option<&Node> {
        self.nodes.iter().find(|n| n.label == label)
    }

    pub fn node_ids(&self) -> HashSet<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    pub fn max_node_id(&self) -> Option<NodeId> {
        self.nodes.iter().map(|n| n.id).max()
    }

    /// Weak connectivity over the live edges. An empty graph counts as
    /// connected.
    pub fn is_connected(&self) -> bool {
        if self.nodes.is_empty() {
            return true;
        }
        let index: HashMap<NodeId, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id, i))
            .collect();
        let mut uf = QuickUnionUf::<UnionBySize>::new(self.nodes.len());
        for edge in &self.edges {
            if let (Some(&a), Some(&b)) = (index.get(&edge.src.id), index.get(&edge.target.id)) {
                uf.union(a, b);
            }
        }
        let root = uf.find(0);
        (1..self.nodes.len()).all(|i| uf.find(i) == root)
    }

    /// (source type, target type) for every edge.
    pub fn edge_type_pairs(&self) -> Vec<(String, String)> {
        self.edges
            .iter()
            .map(|e| (e.src.node_type.clone(), e.target.node_type.clone()))
            .collect()
    }

    // --- Distance tracking ---

    pub fn record_distance(&mut self, pos: Point2D) {
        self.distances.push(pos);
    }

    pub fn distances(&self) -> &[Point2D] {
        &self.distances
    }

    /// Largest single-step jump on each axis between consecutive entries of
    /// the position log. This is local jump magnitude, not layout span.
    pub fn calc_distances(&self) -> (f64, f64) {
        self.distances
            .windows(2)
            .map(|w| w[0].delta_to(&w[1]))
            .fold((0.0, 0.0), |(mx, my), (dx, dy)| (mx.max(dx), my.max(dy)))
    }

    /// Whether the graph sits inside its target band: at least
    /// `size_threshold` nodes, at most `target_size_max`, and both step
    /// distances inside their bands (all bounds inclusive).
    pub fn meets_targets(&self, size_threshold: usize) -> bool {
        let size = self.node_count();
        let (x, y) = self.calc_distances();
        size >= size_threshold
            && size <= self.target_size_max
            && (self.target_x_dist_min..=self.target_x_dist_max).contains(&x)
            && (self.target_y_dist_min..=self.target_y_dist_max).contains(&y)
    }

    // --- Target configuration (unvalidated) ---

    pub fn target_size_min(&self) -> usize {
        self.target_size_min
    }
    pub fn target_size_max(&self) -> usize {
        self.target_size_max
    }
    pub fn set_target_size_min(&mut self, size: usize) {
        self.target_size_min = size;
    }
    pub fn set_target_size_max(&mut self, size: usize) {
        self.target_size_max = size;
    }

    pub fn target_x_dist(&self) -> (f64, f64) {
        (self.target_x_dist_min, self.target_x_dist_max)
    }
    pub fn target_y_dist(&self) -> (f64, f64) {
        (self.target_y_dist_min, self.target_y_dist_max)
    }
    pub fn set_target_x_dist(&mut self, min: f64, max: f64) {
        self.target_x_dist_min = min;
        self.target_x_dist_max = max;
    }
    pub fn set_target_y_dist(&mut self, min: f64, max: f64) {
        self.target_y_dist_min = min;
        self.target_y_dist_max = max;
    }

    pub fn set_max_iterations(&mut self, max: usize) {
        self.max_iterations = max;
    }

    // --- Derivation bookkeeping ---

    pub fn update_rule(&mut self, rule: Rule) {
        self.updated_rule = Some(rule);
    }

    /// The id-renumbered variant of the rule last applied to this graph.
    pub fn updated_rule(&self) -> Option<&Rule> {
        self.updated_rule.as_ref()
    }

    pub fn add_rule_applied(&mut self, rule_id: impl Into<String>) {
        self.rules_applied.push(rule_id.into());
    }

    pub fn generated_rules(&self) -> &[String] {
        &self.rules_applied
    }

    pub fn clear_generated_rules(&mut self) {
        self.rules_applied.clear();
    }

    pub fn ids(&self) -> &[(NodeId, NodeId)] {
        &self.ids
    }

    pub fn set_ids(&mut self, ids: Vec<(NodeId, NodeId)>) {
        self.ids = ids;
    }

    pub fn record_ids(&mut self, ids: impl IntoIterator<Item = (NodeId, NodeId)>) {
        self.ids.extend(ids);
    }

    fn display_id(&self, id: NodeId) -> Option<NodeId> {
        self.ids
            .iter()
            .find(|(engine, _)| *engine == id)
            .map(|&(_, shown)| shown)
    }

    fn display_label(&self, id: NodeId) -> NodeId {
        self.display_id(id).unwrap_or(id)
    }

    /// Display id of every node; nodes without a table entry show their own id.
    pub fn node_list(&self) -> Vec<String> {
        self.nodes.iter().map(|n| self.display_label(n.id).to_string()).collect()
    }

    /// `"src---target"` for every edge, labelled the same way as
    /// [`Graph::node_list`].
    pub fn edge_list(&self) -> Vec<String> {
        self.edges
            .iter()
            .map(|e| format!("{}---{}", self.display_label(e.src.id), self.display_label(e.target.id)))
            .collect()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn chain(ids: &[NodeId]) -> Graph {
        let mut g = Graph::new();
        for &id in ids {
            g.add_node(Node::room(id));
        }
        for pair in ids.windows(2) {
            g.add_edge(Edge::new(Node::room(pair[0]), Node::room(pair[1])));
        }
        g
    }

    #[test]
    fn test_del_nodes_removes_every_matching_id() {
        let mut g = chain(&[1, 2, 3, 4]);
        g.add_node(Node::room(2));
        g.del_nodes(&[Node::room(2), Node::room(4)]);
        let ids: Vec<NodeId> = g.nodes().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_del_edges_is_structural() {
        let mut g = chain(&[1, 2]);
        g.add_edge(Edge::new(Node::room(1), Node::room(3)));
        g.del_edges(&[Edge::new(Node::room(1), Node::room(3))]);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.edges()[0].key(), (1, 2));
    }

    #[test]
    fn test_dangling_edges_pruned() {
        let mut g = chain(&[1, 2, 3]);
        g.del_nodes(&[Node::room(2)]);
        assert_eq!(g.remove_dangling_edges(), 2);
        assert_eq!(g.edge_count(), 0);
        assert!(g.dangling_edges().is_empty());
    }

    #[test]
    fn test_source_and_target_queries() {
        let g = chain(&[1, 2, 3]);
        let first = Node::room(1);
        let mid = Node::room(2);
        let last = Node::room(3);
        assert!(!g.has_source(&first));
        assert!(g.has_target(&first));
        assert!(g.has_source(&mid) && g.has_target(&mid));
        assert!(g.has_source(&last));
        assert!(!g.has_target(&last));
        assert_eq!(g.connected_edges(&mid).len(), 2);
    }

    #[test]
    fn test_lookups_return_none_when_absent() {
        let mut g = chain(&[1]);
        g.add_node(Node::new(9, 's', "start"));
        assert_eq!(g.node_at_id(9).map(|n| n.label), Some('s'));
        assert!(g.node_at_id(42).is_none());
        assert!(g.node_with_label('s').is_some());
        assert!(g.node_with_label('q').is_none());
        assert!(g.contains_id(1));
        assert!(!g.contains_node(&Node::room(2)));
    }

    #[test]
    fn test_calc_distances_measures_steps_not_span() {
        let mut g = Graph::new();
        assert_eq!(g.calc_distances(), (0.0, 0.0));
        g.record_distance(Point2D::new(0.0, 0.0));
        assert_eq!(g.calc_distances(), (0.0, 0.0));
        g.record_distance(Point2D::new(10.0, -30.0));
        g.record_distance(Point2D::new(25.0, -20.0));
        g.record_distance(Point2D::new(30.0, -15.0));
        let (x, y) = g.calc_distances();
        // The span is 30 on x; the largest single step is 15.
        assert_approx_eq!(x, 15.0);
        assert_approx_eq!(y, 30.0);
    }

    #[test]
    fn test_meets_targets_is_inclusive() {
        let mut g = chain(&[1, 2, 3]);
        g.set_target_size_min(3);
        g.set_target_size_max(3);
        assert!(g.meets_targets(3));
        assert!(!g.meets_targets(4));
        g.set_target_size_max(2);
        assert!(!g.meets_targets(3));
    }

    #[test]
    fn test_meets_targets_checks_distance_bands() {
        let mut g = chain(&[1, 2]);
        g.set_target_size_max(10);
        g.record_distance(Point2D::new(0.0, 0.0));
        g.record_distance(Point2D::new(500.0, 5.0));
        g.set_target_x_dist(-1000.0, 400.0);
        assert!(!g.meets_targets(1));
        g.set_target_x_dist(-1000.0, 1000.0);
        g.set_target_y_dist(10.0, 1000.0);
        assert!(!g.meets_targets(1));
        g.set_target_y_dist(0.0, 1000.0);
        assert!(g.meets_targets(1));
    }

    #[test]
    fn test_is_connected() {
        let mut g = chain(&[1, 2, 3]);
        assert!(g.is_connected());
        g.add_node(Node::room(4));
        assert!(!g.is_connected());
        g.add_edge(Edge::new(Node::room(4), Node::room(1)));
        assert!(g.is_connected());
        assert!(Graph::new().is_connected());
    }

    #[test]
    fn test_display_lists_use_id_table() {
        let mut g = chain(&[600, 601]);
        g.add_node(Node::room(7));
        g.record_ids([(600, 12), (601, 40)]);
        assert_eq!(g.node_list(), vec!["12", "40", "7"]);
        assert_eq!(g.edge_list(), vec!["12---40"]);

        let mut auto = Edge::new(Node::room(601), Node::room(600));
        auto.auto_id = true;
        g.add_edge(auto);
        g.add_edge(Edge::new(Node::room(601), Node::room(7)));
        assert_eq!(g.edge_list(), vec!["12---40", "40---12", "40---7"]);
    }

    #[test]
    fn test_clone_is_independent() {
        let original = chain(&[1, 2]);
        let mut copy = original.clone();
        copy.del_nodes(&[Node::room(1)]);
        copy.remove_dangling_edges();
        copy.iteration += 1;
        assert_eq!(original.node_count(), 2);
        assert_eq!(original.edge_count(), 1);
        assert_eq!(original.iteration, 0);
    }

    #[test]
    fn test_failed_sentinel() {
        assert!(Graph::failed().is_failure());
        assert!(!Graph::new().is_failure());
        assert_eq!(Graph::failed().name(), FAIL_GRAPH_NAME);
    }

    #[test]
    fn test_seeded_applies_config() {
        let config = GeneratorConfig {
            target_size_min: 3,
            target_size_max: 8,
            max_iterations: 12,
            ..GeneratorConfig::default()
        };
        let g = Graph::seeded(Node::room(1), &config);
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.target_size_min(), 3);
        assert_eq!(g.target_size_max(), 8);
        assert_eq!(g.max_iterations, 12);
    }
}
