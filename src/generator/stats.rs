// src/generator/stats.rs

use std::time::Duration;

use crate::generator::Derivation;

/// Observational record of one derivation, kept for evaluating rule sets.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct GenerationStats {
    pub generation_time_ms: f64,
    pub node_count: usize,
    pub edge_count: usize,
    pub iterations: usize,
    pub constraints_met: bool,
    pub connected: bool,
}

impl GenerationStats {
    pub fn from_derivation(derivation: &Derivation, elapsed: Duration) -> Self {
        let graph = derivation.graph();
        GenerationStats {
            generation_time_ms: elapsed.as_secs_f64() * 1000.0,
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            iterations: graph.iteration,
            constraints_met: derivation.is_complete(),
            connected: derivation.is_complete() && graph.is_connected(),
        }
    }
}

/// Fraction of runs that met their constraints; 0 for an empty slice.
pub fn success_rate(runs: &[GenerationStats]) -> f64 {
    if runs.is_empty() {
        return 0.0;
    }
    runs.iter().filter(|s| s.constraints_met).count() as f64 / runs.len() as f64
}

pub fn mean_generation_time_ms(runs: &[GenerationStats]) -> f64 {
    if runs.is_empty() {
        return 0.0;
    }
    runs.iter().map(|s| s.generation_time_ms).sum::<f64>() / runs.len() as f64
}
