// src/grammar/rule_factory.rs

use std::mem;

use log::debug;

use crate::error::{GrammarError, Result};
use crate::grammar::{Rule, Side};
use crate::graph::{Components, Edge, Graph, Node, NodeId};
use crate::utils::RandomGenerator;

/// Ids handed to nodes while a rule is being authored.
const AUTHORED_ID_MIN: NodeId = 1;
const AUTHORED_ID_MAX: NodeId = 499;

/// Where a renumbered right-hand side may start its id block.
const GENERATED_ID_MIN: NodeId = 499;
const GENERATED_ID_MAX: NodeId = 998;

/// Authors rules and renumbers their right-hand sides for splicing.
///
/// Nodes and edges are first added to an in-progress left/right pair, then
/// [`RuleFactory::create_rule`] snapshots them into a stored [`Rule`].
#[derive(Debug, Clone)]
pub struct RuleFactory {
    left: Components,
    right: Components,
    rg: RandomGenerator,
    rules: Vec<Rule>,
    id_pairs: Vec<(NodeId, NodeId)>,
}

impl RuleFactory {
    pub fn new() -> Self {
        Self::with_generator(RandomGenerator::new())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_generator(RandomGenerator::with_seed(seed))
    }

    pub fn with_generator(rg: RandomGenerator) -> Self {
        RuleFactory {
            left: Components::default(),
            right: Components::default(),
            rg,
            rules: Vec::new(),
            id_pairs: Vec::new(),
        }
    }

    /// Replaces the factory's generator, keeping its rules.
    pub fn reseed(&mut self, rg: RandomGenerator) {
        self.rg = rg;
    }

    fn side_mut(&mut self, side: Side) -> &mut Components {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// Appends a node with a random id in `[1, 499]` to `side` and returns a
    /// copy of it. An id already used in either in-progress side is bumped
    /// to the next free one.
    pub fn add_node(&mut self, side: Side, node_type: &str) -> Result<Node> {
        let mut id = self.rg.generate_uniform(AUTHORED_ID_MIN, AUTHORED_ID_MAX)?;
        while self.left.contains_id(id) || self.right.contains_id(id) {
            id += 1;
        }
        let node = Node::new(id, ' ', node_type);
        self.side_mut(side).nodes.push(node.clone());
        Ok(node)
    }

    pub fn add_edge(&mut self, side: Side, src: &Node, target: &Node) {
        let edge = Edge::new(src.clone(), target.clone());
        self.side_mut(side).edges.push(edge);
    }

    pub fn left(&self) -> &Components {
        &self.left
    }

    pub fn right(&self) -> &Components {
        &self.right
    }

    /// Snapshots the in-progress sides into a stored rule and clears them.
    pub fn create_rule(&mut self, rule_id: impl Into<String>) {
        let left = mem::take(&mut self.left);
        let right = mem::take(&mut self.right);
        self.rules.push(Rule::with_id(rule_id, left, right));
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn set_rules(&mut self, rules: Vec<Rule>) {
        self.rules = rules;
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn clear_rules(&mut self) {
        self.rules.clear();
    }

    /// # Errors
    ///
    /// [`GrammarError::RuleNotFound`] if no stored rule has `id`.
    pub fn rule_at_id(&self, id: &str) -> Result<&Rule> {
        self.rules
            .iter()
            .find(|r| r.id() == id)
            .ok_or_else(|| GrammarError::RuleNotFound(id.to_string()))
    }

    /// Merges one side of `new_rule` into the stored rule `rule_id`.
    ///
    /// A node is skipped when the stored side already holds the same id at
    /// the same position; everything else is appended. Edges already present
    /// (same source and target ids) are skipped.
    pub fn update_rule(&mut self, rule_id: &str, new_rule: &Rule, side: Side) -> Result<()> {
        let stored = self
            .rules
            .iter_mut()
            .find(|r| r.id() == rule_id)
            .ok_or_else(|| GrammarError::RuleNotFound(rule_id.to_string()))?;

        let (target, incoming) = match side {
            Side::Left => (stored.left_mut(), new_rule.left()),
            Side::Right => (stored.right_mut(), new_rule.right()),
        };

        for (pos, node) in incoming.nodes.iter().enumerate() {
            if target.nodes.get(pos).map(|n| n.id) == Some(node.id) {
                continue;
            }
            target.nodes.push(node.clone());
        }
        for edge in &incoming.edges {
            if !target.edges.iter().any(|e| e.key() == edge.key()) {
                target.edges.push(edge.clone());
            }
        }
        Ok(())
    }

    /// Correspondence (authored id, new id) from the last
    /// [`RuleFactory::generate_new_ids`] call.
    pub fn new_ids(&self) -> &[(NodeId, NodeId)] {
        &self.id_pairs
    }

    pub fn clear_id_pairs(&mut self) {
        self.id_pairs.clear();
    }

    /// Returns a copy of `rule`'s right-hand side renumbered so that no id
    /// collides with a node already in `graph`.
    ///
    /// The block of consecutive ids starts at a random offset in
    /// `[499, 998]`; if any id in the block is taken, the block moves past
    /// the graph's highest id. Every right-hand node is remapped before any
    /// edge, so edge endpoints resolve through the id-pair table. The
    /// returned rule keeps `rule`'s id and has an empty left side.
    ///
    /// # Errors
    ///
    /// [`GrammarError::UnresolvedEdgeEndpoint`] if an edge references a node
    /// that is not on the right-hand side.
    pub fn generate_new_ids(&mut self, rule: &Rule, graph: &Graph) -> Result<Rule> {
        let count = rule.right_size() as NodeId;
        let mut next = self.rg.generate_uniform(GENERATED_ID_MIN, GENERATED_ID_MAX)?;

        let used = graph.node_ids();
        if (next..next + count).any(|id| used.contains(&id)) {
            if let Some(max) = graph.max_node_id() {
                next = max + 1;
            }
        }

        let mut updated = Rule::default();
        updated.set_id(rule.id());
        let mut pairs = Vec::with_capacity(rule.right_size());

        for node in &rule.right().nodes {
            pairs.push((node.id, next));
            updated.set_right(Node::new(next, node.label, node.node_type.clone()));
            next += 1;
        }

        for edge in &rule.right().edges {
            let src = resolve(&pairs, &updated, rule, edge.src.id)?;
            let target = resolve(&pairs, &updated, rule, edge.target.id)?;
            let mut new_edge = Edge::with_type(src, target, edge.edge_type.clone());
            new_edge.auto_id = true;
            updated.add_right_edge(new_edge);
        }

        debug!("renumbered {} as {}", rule, updated);
        self.id_pairs = pairs;
        Ok(updated)
    }

    /// Loads the three built-in chain rules:
    /// `RuleOne` (1 node -> 5-node chain), `RuleTwo` (2-node chain ->
    /// 3-node chain) and `RuleThree` (3-node chain -> 4-node chain).
    pub fn load_sample_rules(&mut self) -> Result<()> {
        self.chain_rule("RuleOne", 1, 5)?;
        self.chain_rule("RuleTwo", 2, 3)?;
        self.chain_rule("RuleThree", 3, 4)
    }

    fn chain_rule(&mut self, rule_id: &str, left: usize, right: usize) -> Result<()> {
        for (side, len) in [(Side::Left, left), (Side::Right, right)] {
            let nodes = (0..len)
                .map(|_| self.add_node(side, "room"))
                .collect::<Result<Vec<_>>>()?;
            for pair in nodes.windows(2) {
                self.add_edge(side, &pair[0], &pair[1]);
            }
        }
        self.create_rule(rule_id);
        Ok(())
    }
}

impl Default for RuleFactory {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve(pairs: &[(NodeId, NodeId)], updated: &Rule, rule: &Rule, old: NodeId) -> Result<Node> {
    let unresolved = || GrammarError::UnresolvedEdgeEndpoint {
        rule: rule.id().to_string(),
        node: old,
    };
    let &(_, new) = pairs.iter().find(|(o, _)| *o == old).ok_or_else(unresolved)?;
    updated.right_node_at_id(new).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn chain_factory(len: usize) -> RuleFactory {
        let mut rf = RuleFactory::with_seed(11);
        rf.add_node(Side::Left, "room").unwrap();
        let nodes: Vec<Node> = (0..len)
            .map(|_| rf.add_node(Side::Right, "room").unwrap())
            .collect();
        for pair in nodes.windows(2) {
            rf.add_edge(Side::Right, &pair[0], &pair[1]);
        }
        rf.create_rule("Chain");
        rf
    }

    #[test]
    fn test_add_node_ids_in_range_and_unique() {
        let mut rf = RuleFactory::with_seed(5);
        let mut seen = HashSet::new();
        for _ in 0..40 {
            let node = rf.add_node(Side::Right, "room").unwrap();
            assert!(node.id >= AUTHORED_ID_MIN);
            assert!(seen.insert(node.id));
        }
        let node = rf.add_node(Side::Left, "start").unwrap();
        assert_eq!(node.node_type, "start");
        assert_eq!(rf.left().nodes.len(), 1);
        assert_eq!(rf.right().nodes.len(), 40);
    }

    #[test]
    fn test_create_rule_clears_buffers() {
        let rf = chain_factory(3);
        assert!(rf.left().is_empty());
        assert!(rf.right().is_empty());
        let rule = rf.rule_at_id("Chain").unwrap();
        assert_eq!(rule.left_size(), 1);
        assert_eq!(rule.right_size(), 3);
        assert_eq!(rule.right_edge_size(), 2);
    }

    #[test]
    fn test_rule_at_id_missing() {
        let rf = chain_factory(1);
        assert!(matches!(
            rf.rule_at_id("Nope"),
            Err(GrammarError::RuleNotFound(id)) if id == "Nope"
        ));
    }

    #[test]
    fn test_generate_new_ids_are_fresh_and_resolved() {
        let mut rf = chain_factory(4);
        let rule = rf.rule_at_id("Chain").unwrap().clone();
        let mut graph = Graph::new();
        graph.add_node(Node::room(1));

        let updated = rf.generate_new_ids(&rule, &graph).unwrap();
        assert_eq!(updated.id(), "Chain");
        assert_eq!(updated.left_size(), 0);

        let fresh: HashSet<NodeId> = updated.right().node_ids().into_iter().collect();
        assert_eq!(fresh.len(), 4);
        assert!(fresh.iter().all(|id| !graph.contains_id(*id)));
        for edge in &updated.right().edges {
            assert!(fresh.contains(&edge.src.id));
            assert!(fresh.contains(&edge.target.id));
            assert!(edge.auto_id);
        }

        let pairs = rf.new_ids();
        assert_eq!(pairs.len(), 4);
        for (old, new) in pairs {
            assert!(rule.right().contains_id(*old));
            assert!(fresh.contains(new));
        }
        rf.clear_id_pairs();
        assert!(rf.new_ids().is_empty());
    }

    #[test]
    fn test_generate_new_ids_preserves_chain_shape() {
        let mut rf = chain_factory(3);
        let rule = rf.rule_at_id("Chain").unwrap().clone();
        let updated = rf.generate_new_ids(&rule, &Graph::new()).unwrap();
        let ids = updated.right().node_ids();
        let keys: Vec<(NodeId, NodeId)> = updated.right().edges.iter().map(Edge::key).collect();
        assert_eq!(keys, vec![(ids[0], ids[1]), (ids[1], ids[2])]);
    }

    #[test]
    fn test_generate_new_ids_moves_past_taken_block() {
        let mut rf = chain_factory(3);
        let rule = rf.rule_at_id("Chain").unwrap().clone();
        let mut graph = Graph::new();
        for id in 499..=1000 {
            graph.add_node(Node::room(id));
        }
        let updated = rf.generate_new_ids(&rule, &graph).unwrap();
        assert_eq!(updated.right().node_ids(), vec![1001, 1002, 1003]);
    }

    #[test]
    fn test_generate_new_ids_single_node() {
        let mut rf = chain_factory(1);
        let rule = rf.rule_at_id("Chain").unwrap().clone();
        let updated = rf.generate_new_ids(&rule, &Graph::new()).unwrap();
        assert_eq!(updated.right_size(), 1);
        assert_eq!(updated.right_edge_size(), 0);
    }

    #[test]
    fn test_generate_new_ids_unresolved_endpoint() {
        let inside = Node::room(10);
        let outside = Node::room(20);
        let rule = Rule::with_id(
            "Broken",
            Components::new(vec![Node::room(1)], vec![]),
            Components::new(vec![inside.clone()], vec![Edge::new(inside, outside)]),
        );
        let mut rf = RuleFactory::with_seed(2);
        let err = rf.generate_new_ids(&rule, &Graph::new()).unwrap_err();
        assert!(matches!(
            err,
            GrammarError::UnresolvedEdgeEndpoint { ref rule, node: 20 } if rule == "Broken"
        ));
    }

    #[test]
    fn test_update_rule_skips_duplicates_by_position() {
        let mut rf = chain_factory(2);
        let stored = rf.rule_at_id("Chain").unwrap().clone();
        let existing = stored.right().nodes[0].clone();
        let extra = Node::room(9999);

        let mut incoming = Rule::default();
        incoming.set_rights([existing.clone(), extra.clone()]);
        incoming.add_right_edges(stored.right().edges.clone());
        incoming.add_right_edge(Edge::new(existing, extra));

        rf.update_rule("Chain", &incoming, Side::Right).unwrap();
        let merged = rf.rule_at_id("Chain").unwrap();
        assert_eq!(merged.right_size(), 3);
        assert_eq!(merged.right_edge_size(), 2);
        assert_eq!(merged.left_size(), 1);

        assert!(rf.update_rule("Missing", &incoming, Side::Left).is_err());
    }

    #[test]
    fn test_load_sample_rules() {
        let mut rf = RuleFactory::with_seed(9);
        rf.load_sample_rules().unwrap();
        let shape: Vec<(&str, usize, usize, usize, usize)> = rf
            .rules()
            .iter()
            .map(|r| (r.id(), r.left_size(), r.left_edge_size(), r.right_size(), r.right_edge_size()))
            .collect();
        assert_eq!(
            shape,
            vec![
                ("RuleOne", 1, 0, 5, 4),
                ("RuleTwo", 2, 1, 3, 2),
                ("RuleThree", 3, 2, 4, 3),
            ]
        );
        rf.clear_rules();
        assert!(rf.rules().is_empty());
    }
}
