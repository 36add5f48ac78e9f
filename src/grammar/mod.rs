// src/grammar/mod.rs
mod rule;
mod rule_factory;

pub use rule::Rule;
pub use rule_factory::RuleFactory;

/// Which side of a rule an authoring call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}
