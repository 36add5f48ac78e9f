// src/generator/procedural.rs

use std::path::Path;
use std::time::Instant;

use log::info;
use rayon::prelude::*;

use crate::error::Result;
use crate::generator::{Derivation, GenerationStats, GenerationStrategy, GeneratorConfig};
use crate::grammar::RuleFactory;
use crate::graph::{Graph, Node};
use crate::utils::RandomGenerator;

/// Id of the single room a derivation grows from.
const SEED_NODE_ID: i32 = 1;

/// Runs derivations for a config and rule set and keeps their history.
pub struct ProceduralGenerator {
    config: GeneratorConfig,
    factory: RuleFactory,
    graph: Graph,
    graph_updates: Vec<Graph>,
    stats: Vec<GenerationStats>,
}

impl ProceduralGenerator {
    pub fn new(config: GeneratorConfig, factory: RuleFactory) -> Self {
        let mut graph = Graph::new();
        graph.apply_config(&config);
        ProceduralGenerator {
            config,
            factory,
            graph,
            graph_updates: Vec::new(),
            stats: Vec::new(),
        }
    }

    /// A generator over the built-in sample rules, seeded from `config.seed`
    /// when one is set.
    pub fn with_sample_rules(config: GeneratorConfig) -> Result<Self> {
        let mut factory = match config.seed {
            Some(seed) => RuleFactory::with_seed(seed),
            None => RuleFactory::new(),
        };
        factory.load_sample_rules()?;
        Ok(Self::new(config, factory))
    }

    /// [`ProceduralGenerator::with_sample_rules`] over a JSON config file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = GeneratorConfig::load(path)?;
        Self::with_sample_rules(config)
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn factory(&self) -> &RuleFactory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut RuleFactory {
        &mut self.factory
    }

    /// The graph produced by the latest run, or the FAIL sentinel.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Every graph produced so far, oldest first.
    pub fn graph_updates(&self) -> &[Graph] {
        &self.graph_updates
    }

    pub fn stats(&self) -> &[GenerationStats] {
        &self.stats
    }

    pub fn last_stats(&self) -> Option<&GenerationStats> {
        self.stats.last()
    }

    pub fn seed_graph(&self) -> Graph {
        Graph::seeded(Node::room(SEED_NODE_ID), &self.config)
    }

    /// Resets the current graph to an empty one carrying the config's targets.
    pub fn new_graph(&mut self) {
        let mut graph = Graph::new();
        graph.apply_config(&self.config);
        self.graph = graph;
    }

    pub fn generate(&mut self) -> Result<Derivation> {
        let seed = self.seed_graph();
        self.generate_from(seed)
    }

    pub fn generate_from(&mut self, seed: Graph) -> Result<Derivation> {
        let rg = match self.config.seed {
            Some(base) => RandomGenerator::with_seed(base.wrapping_add(self.stats.len() as u64)),
            None => RandomGenerator::new(),
        };
        let mut strategy = GenerationStrategy::with_generator(self.factory.clone(), rg);

        let start = Instant::now();
        let derivation = strategy.derive_graph(seed)?;
        let stats = GenerationStats::from_derivation(&derivation, start.elapsed());

        info!(
            "run {}: {} in {:.2} ms, {} node(s) after {} iteration(s)",
            self.stats.len() + 1,
            if stats.constraints_met { "complete" } else { "failed" },
            stats.generation_time_ms,
            stats.node_count,
            stats.iterations
        );

        let mut graph = derivation.graph().clone();
        graph.completed = derivation.is_complete();
        self.graph_updates.push(graph.clone());
        self.graph = graph;
        self.stats.push(stats);
        Ok(derivation)
    }

    /// Runs `runs` independent derivations in parallel and returns their
    /// stats in run order. Each run gets its own generator, derived from the
    /// config seed when one is set, so results are reproducible regardless
    /// of thread scheduling. History is not touched.
    pub fn evaluate(&self, runs: usize) -> Result<Vec<GenerationStats>> {
        let base = self.config.seed;
        (0..runs)
            .into_par_iter()
            .map(|run| -> Result<GenerationStats> {
                let (factory_rg, strategy_rg) = match base {
                    Some(seed) => {
                        let run_seed = seed.wrapping_add(run as u64).wrapping_mul(2);
                        (
                            RandomGenerator::with_seed(run_seed),
                            RandomGenerator::with_seed(run_seed.wrapping_add(1)),
                        )
                    }
                    None => (RandomGenerator::new(), RandomGenerator::new()),
                };
                let mut factory = self.factory.clone();
                factory.reseed(factory_rg);
                let mut strategy = GenerationStrategy::with_generator(factory, strategy_rg);

                let start = Instant::now();
                let derivation = strategy.derive_graph(self.seed_graph())?;
                Ok(GenerationStats::from_derivation(&derivation, start.elapsed()))
            })
            .collect()
    }
}
