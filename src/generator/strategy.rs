// src/generator/strategy.rs

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::error::Result;
use crate::grammar::{Rule, RuleFactory};
use crate::graph::{Components, Edge, Graph, Node, NodeId};
use crate::utils::{Point2D, RandomGenerator};

pub const START_NODE_TYPE: &str = "start";
pub const END_NODE_TYPE: &str = "end";

/// Production positions are jittered with a spread of
/// `target_size_min * POSITION_SPREAD`.
const POSITION_SPREAD: i32 = 50;
/// How far synthesized start/end nodes sit from their neighbour on each axis.
const TERMINAL_OFFSET: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The iteration cap was reached before the targets were met.
    IterationCap,
    /// Every candidate rule was dropped before the targets were met.
    PoolExhausted,
    /// There was no seed node to grow from.
    EmptySeed,
}

/// Result of one derivation.
#[derive(Debug, Clone)]
pub enum Derivation {
    Complete(Graph),
    /// `graph` is the FAIL-named sentinel, carrying the iteration count spent.
    Failed { reason: FailureReason, graph: Graph },
}

impl Derivation {
    pub fn is_complete(&self) -> bool {
        matches!(self, Derivation::Complete(_))
    }

    pub fn graph(&self) -> &Graph {
        match self {
            Derivation::Complete(graph) | Derivation::Failed { graph, .. } => graph,
        }
    }

    pub fn into_graph(self) -> Graph {
        match self {
            Derivation::Complete(graph) | Derivation::Failed { graph, .. } => graph,
        }
    }

    pub fn failure(&self) -> Option<FailureReason> {
        match self {
            Derivation::Complete(_) => None,
            Derivation::Failed { reason, .. } => Some(*reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Running,
    Converged,
    PoolExhausted,
}

/// Matches rules against a graph, splices their productions in, and drives
/// the derivation loop.
///
/// The scratch fields (`matching_nodes`, `left_side`,
/// `potential_replacements`) hold the state of the last match attempt and are
/// cleared after every application.
#[derive(Debug, Clone)]
pub struct GenerationStrategy {
    factory: RuleFactory,
    rg: RandomGenerator,
    rules: Vec<Rule>,
    seed_node: Option<Node>,

    matching_nodes: Vec<(NodeId, NodeId)>,
    left_side: Components,
    potential_replacements: Vec<Rule>,
}

impl GenerationStrategy {
    pub fn new(factory: RuleFactory) -> Self {
        Self::with_generator(factory, RandomGenerator::new())
    }

    pub fn with_generator(factory: RuleFactory, rg: RandomGenerator) -> Self {
        GenerationStrategy {
            rules: factory.rules().to_vec(),
            factory,
            rg,
            seed_node: None,
            matching_nodes: Vec::new(),
            left_side: Components::default(),
            potential_replacements: Vec::new(),
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// (rule node id, graph node id) pairs picked by the last match.
    pub fn matching_nodes(&self) -> &[(NodeId, NodeId)] {
        &self.matching_nodes
    }

    /// Graph nodes (and the edges between them) picked for replacement.
    pub fn matches(&self) -> &Components {
        &self.left_side
    }

    pub fn potential_replacements(&self) -> &[Rule] {
        &self.potential_replacements
    }

    fn clear_matches(&mut self) {
        self.matching_nodes.clear();
        self.left_side.clear();
        self.potential_replacements.clear();
    }

    /// Picks up to `rule.left_size()` (rule node, graph node) pairs with
    /// matching types.
    ///
    /// All type-matching pairs are listed, then picked with a stride of
    /// `candidates / left_size` (one more while at least two candidates
    /// remain and the candidate count is even), starting from a random
    /// candidate. A slot is skipped when its rule node or its graph node is
    /// already paired, so every pick binds a different graph node. Picking
    /// stops at `left_size` pairs or when no unpaired slot is left.
    pub fn check_left_nodes(&mut self, rule: &Rule, graph: &Graph) -> Result<()> {
        self.matching_nodes.clear();

        let left_size = rule.left_size();
        if left_size == 0 || graph.node_count() < left_size {
            return Ok(());
        }

        let candidates: Vec<(NodeId, NodeId)> = rule
            .left()
            .nodes
            .iter()
            .flat_map(|r| {
                graph
                    .nodes()
                    .iter()
                    .filter(move |g| g.node_type == r.node_type)
                    .map(move |g| (r.id, g.id))
            })
            .collect();
        if candidates.is_empty() {
            return Ok(());
        }

        let count = candidates.len();
        let mut rule_used: HashSet<NodeId> = HashSet::new();
        let mut graph_used: HashSet<NodeId> = HashSet::new();
        let mut index = self.rg.generate_uniform(0, count - 1)?;

        while self.matching_nodes.len() < left_size {
            let free = (0..count).map(|o| (index + o) % count).find(|&i| {
                let (rule_id, graph_id) = candidates[i];
                !rule_used.contains(&rule_id) && !graph_used.contains(&graph_id)
            });
            let Some(slot) = free else {
                break;
            };
            let (rule_id, graph_id) = candidates[slot];
            rule_used.insert(rule_id);
            graph_used.insert(graph_id);
            self.matching_nodes.push(candidates[slot]);

            let remaining = count - self.matching_nodes.len();
            let mut stride = count / left_size;
            if remaining >= 2 && count % 2 == 0 {
                stride += 1;
            }
            index = slot + stride.max(1);
        }
        Ok(())
    }

    /// Resolves the matched pairs into the graph nodes they name, plus the
    /// graph edges running between those nodes.
    pub fn check_left_edges(&mut self, graph: &Graph) {
        let mut left = Components::default();
        for &(_, graph_id) in &self.matching_nodes {
            if left.contains_id(graph_id) {
                continue;
            }
            if let Some(node) = graph.node_at_id(graph_id) {
                left.nodes.push(node.clone());
            }
        }
        left.edges = graph
            .edges()
            .iter()
            .filter(|e| left.contains_id(e.src.id) && left.contains_id(e.target.id))
            .cloned()
            .collect();
        self.left_side = left;
    }

    /// Runs matching and, if anything matched, records a transient rule whose
    /// left side is the matched graph region and whose right side is `rule`'s.
    pub fn filter_nodes(&mut self, rule: &Rule, graph: &Graph) -> Result<()> {
        self.check_left_nodes(rule, graph)?;
        self.check_left_edges(graph);

        if !self.left_side.nodes.is_empty() {
            let left = Components::new(self.left_side.nodes.clone(), Vec::new());
            self.potential_replacements
                .push(Rule::with_id(rule.id(), left, rule.right().clone()));
        }
        Ok(())
    }

    pub fn add_production(right: &Components) -> Components {
        Components::new(right.nodes.clone(), right.edges.clone())
    }

    /// Applies `rule` once to `graph` and returns the result.
    ///
    /// When nothing matches the graph comes back unchanged, iteration counter
    /// included. Otherwise the matched nodes are replaced by a renumbered copy
    /// of the right-hand side: edges entering the first matched node from
    /// outside the region are rewired to the production's first node, edges
    /// leaving the last matched node to the outside are rewired from its last
    /// node, and every other edge touching the region is pruned.
    pub fn apply_rule(&mut self, rule: &Rule, mut graph: Graph) -> Result<Graph> {
        self.potential_replacements.clear();
        self.filter_nodes(rule, &graph)?;

        if self.potential_replacements.is_empty() {
            debug!("rule {} found no match", rule.id());
            self.clear_matches();
            return Ok(graph);
        }

        let mut replacement = self.factory.generate_new_ids(rule, &graph)?;
        replacement.set_lefts(self.left_side.nodes.iter().cloned());
        graph.record_ids(
            self.factory
                .new_ids()
                .iter()
                .map(|&(authored, engine)| (engine, authored)),
        );
        self.factory.clear_id_pairs();
        graph.update_rule(replacement.clone());

        let matched: HashSet<NodeId> = replacement.left().node_ids().into_iter().collect();
        let (incoming, outgoing) = match (replacement.left().nodes.first(), replacement.left().nodes.last()) {
            (Some(first), Some(last)) => (
                external_sources(&graph, first, &matched),
                external_targets(&graph, last, &matched),
            ),
            _ => (Vec::new(), Vec::new()),
        };

        graph.del_nodes(&replacement.left().nodes);
        let pruned = graph.remove_dangling_edges();

        let mut production = Self::add_production(replacement.right());

        let spread = i32::try_from(graph.target_size_min())
            .unwrap_or(i32::MAX)
            .saturating_mul(POSITION_SPREAD);
        for node in &mut production.nodes {
            let x = self.rg.generate_gaussian(0, spread)?;
            let y = self.rg.generate_gaussian(0, spread)?;
            node.pos = Point2D::new(f64::from(x), f64::from(y));
            graph.record_distance(node.pos);
        }

        if let (Some(head), Some(tail)) = (production.nodes.first().cloned(), production.nodes.last().cloned()) {
            for edge in incoming {
                production.edges.push(Edge { target: head.clone(), ..edge });
            }
            for edge in outgoing {
                production.edges.push(Edge { src: tail.clone(), ..edge });
            }
        }

        debug!(
            "applied {}: replaced {} node(s), pruned {} edge(s), added {} node(s) and {} edge(s)",
            rule.id(),
            matched.len(),
            pruned,
            production.nodes.len(),
            production.edges.len()
        );

        for node in production.nodes {
            graph.add_node(node);
        }
        for edge in production.edges {
            graph.add_edge(edge);
        }

        self.clear_matches();
        graph.iteration += 1;
        Ok(graph)
    }

    /// Grows `graph` until it meets its targets, the candidate pool runs dry,
    /// or the iteration cap is hit.
    ///
    /// Each pass draws a rule from the pool and applies it to a copy of the
    /// graph. The copy is accepted and the derivation ends when it meets the
    /// targets against a size threshold drawn from the target band. A copy
    /// that merely grew is accepted too; the rule is then replaced in the pool
    /// by its renumbered variant. Anything else is discarded and the rule
    /// dropped. Every pass costs exactly one iteration, and a derivation that
    /// only converges on the pass reaching the cap still fails.
    ///
    /// # Errors
    ///
    /// Only on malformed input: an inverted target size band, or a rule whose
    /// right-hand edges reference nodes outside its right-hand side.
    pub fn derive_graph(&mut self, graph: Graph) -> Result<Derivation> {
        let mut graph = graph;
        let mut pool = self.rules.clone();
        self.seed_node = find_seed(&graph);

        if graph.node_count() == 0 {
            warn!("derivation has no seed node");
            return Ok(self.failed(&graph, FailureReason::EmptySeed));
        }

        info!(
            "deriving from {} node(s) with {} rule(s), targets {}..={}, cap {}",
            graph.node_count(),
            pool.len(),
            graph.target_size_min(),
            graph.target_size_max(),
            graph.max_iterations
        );

        let mut state = LoopState::Running;
        while state == LoopState::Running && graph.iteration < graph.max_iterations {
            let iteration = graph.iteration;

            if pool.is_empty() {
                state = LoopState::PoolExhausted;
                graph.iteration = iteration + 1;
                continue;
            }

            // Draws one past the end; any non-zero draw shifts down by one, so
            // index 0 is hit by two draws.
            let mut index = self.rg.generate_uniform(0, pool.len())?;
            if index > 0 {
                index -= 1;
            }
            let rule = pool[index].clone();
            let size = graph.node_count();

            let candidate = self.apply_rule(&rule, graph.clone())?;
            let applied = candidate.iteration > iteration;
            let threshold = self
                .rg
                .generate_uniform(graph.target_size_min(), graph.target_size_max())?;

            if applied && candidate.meets_targets(threshold) {
                debug!("iteration {}: {} met targets at {} node(s)", iteration, rule.id(), candidate.node_count());
                graph = candidate;
                graph.add_rule_applied(rule.id());
                state = LoopState::Converged;
            } else if applied && candidate.node_count() > size {
                debug!("iteration {}: {} grew graph to {} node(s)", iteration, rule.id(), candidate.node_count());
                let renumbered = candidate.updated_rule().cloned();
                graph = candidate;
                graph.add_rule_applied(rule.id());
                pool.remove(index);
                if let Some(renumbered) = renumbered {
                    pool.push(renumbered);
                }
            } else {
                debug!("iteration {}: dropping {}", iteration, rule.id());
                pool.remove(index);
            }

            graph.iteration = iteration + 1;
        }

        match state {
            LoopState::Converged if graph.iteration >= graph.max_iterations => {
                Ok(self.failed(&graph, FailureReason::IterationCap))
            }
            LoopState::Converged => {
                self.finalize(&mut graph);
                graph.completed = true;
                info!(
                    "derivation complete after {} iteration(s): {} node(s), {} edge(s)",
                    graph.iteration,
                    graph.node_count(),
                    graph.edge_count()
                );
                Ok(Derivation::Complete(graph))
            }
            LoopState::PoolExhausted => Ok(self.failed(&graph, FailureReason::PoolExhausted)),
            LoopState::Running => Ok(self.failed(&graph, FailureReason::IterationCap)),
        }
    }

    fn failed(&mut self, graph: &Graph, reason: FailureReason) -> Derivation {
        warn!(
            "generation failed ({:?}) after {} of {} iteration(s)",
            reason, graph.iteration, graph.max_iterations
        );
        self.seed_node = None;
        let mut sentinel = Graph::failed();
        sentinel.iteration = graph.iteration;
        sentinel.max_iterations = graph.max_iterations;
        Derivation::Failed {
            reason,
            graph: sentinel,
        }
    }

    /// Drops the seed node if it survived, then wires a start node to the
    /// first node and an end node from the last one. Either is skipped when
    /// the graph already has a node of that type.
    fn finalize(&mut self, graph: &mut Graph) {
        if let Some(seed) = self.seed_node.take() {
            if graph.contains_node(&seed) {
                graph.del_nodes(&[seed]);
                graph.remove_dangling_edges();
            }
        }

        let first = graph.nodes().first().cloned();
        let last = graph.nodes().last().cloned();
        let mut next_id = graph.max_node_id().map_or(1, |id| id + 1);

        if !graph.nodes().iter().any(|n| n.is_type(START_NODE_TYPE)) {
            let mut start = Node::new(next_id, 's', START_NODE_TYPE);
            next_id += 1;
            if let Some(first) = &first {
                start.pos = first.pos.offset(-TERMINAL_OFFSET, -TERMINAL_OFFSET);
                graph.add_edge(Edge::new(start.clone(), first.clone()));
            }
            graph.add_node(start);
        }

        if !graph.nodes().iter().any(|n| n.is_type(END_NODE_TYPE)) {
            let mut end = Node::new(next_id, 'e', END_NODE_TYPE);
            if let Some(last) = &last {
                end.pos = last.pos.offset(-TERMINAL_OFFSET, -TERMINAL_OFFSET);
                graph.add_edge(Edge::new(last.clone(), end.clone()));
            }
            graph.add_node(end);
        }
    }
}

/// The single node that is neither a start nor an end node, if there is
/// exactly one.
fn find_seed(graph: &Graph) -> Option<Node> {
    let mut interior = graph
        .nodes()
        .iter()
        .filter(|n| !n.is_type(START_NODE_TYPE) && !n.is_type(END_NODE_TYPE));
    match (interior.next(), interior.next()) {
        (Some(seed), None) => Some(seed.clone()),
        _ => None,
    }
}

fn external_sources(graph: &Graph, first: &Node, matched: &HashSet<NodeId>) -> Vec<Edge> {
    if !graph.has_source(first) {
        return Vec::new();
    }
    graph
        .connected_edges(first)
        .into_iter()
        .filter(|e| e.target.id == first.id && !matched.contains(&e.src.id))
        .cloned()
        .collect()
}

fn external_targets(graph: &Graph, last: &Node, matched: &HashSet<NodeId>) -> Vec<Edge> {
    if !graph.has_target(last) {
        return Vec::new();
    }
    graph
        .connected_edges(last)
        .into_iter()
        .filter(|e| e.src.id == last.id && !matched.contains(&e.target.id))
        .cloned()
        .collect()
}
