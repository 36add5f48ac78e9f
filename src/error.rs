// src/error.rs

use thiserror::Error;

use crate::graph::NodeId;

/// Errors raised while loading a generator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors produced by the grammar engine.
///
/// A rule that simply fails to match is not an error; neither is running out
/// of iterations. Those surface through [`crate::generator::Derivation`].
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("invalid generation range: {min} > {max}")]
    InvalidRange { min: String, max: String },

    #[error("rule `{0}` not found")]
    RuleNotFound(String),

    #[error("node with ID {0} not found")]
    NodeNotFound(NodeId),

    /// A right-hand edge references a node that is not on the right-hand side.
    #[error("rule `{rule}` has an edge endpoint {node} outside its right-hand side")]
    UnresolvedEdgeEndpoint { rule: String, node: NodeId },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, GrammarError>;
