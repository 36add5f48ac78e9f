// src/generator/mod.rs
pub mod config;
pub mod procedural;
pub mod stats;
pub mod strategy;

pub use config::GeneratorConfig;
pub use procedural::ProceduralGenerator;
pub use stats::GenerationStats;
pub use strategy::{Derivation, FailureReason, GenerationStrategy, END_NODE_TYPE, START_NODE_TYPE};
