// src/generator/config.rs

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::graph::DEFAULT_MAX_ITERATIONS;

/// Constraint band and iteration budget for a derivation.
///
/// Missing fields fall back to their defaults, so a config file only needs
/// to name what it changes. Bounds are not validated here; an inverted size
/// band surfaces as an invalid-range error once a derivation draws from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub target_size_min: usize,
    pub target_size_max: usize,
    pub target_x_dist_min: f64,
    pub target_x_dist_max: f64,
    pub target_y_dist_min: f64,
    pub target_y_dist_max: f64,
    pub max_iterations: usize,
    /// Fixed seed for reproducible runs; OS entropy when absent.
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            target_size_min: 10,
            target_size_max: 50,
            target_x_dist_min: -1000.0,
            target_x_dist_max: 1000.0,
            target_y_dist_min: -1000.0,
            target_y_dist_max: 1000.0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
