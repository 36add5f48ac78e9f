// src/utils/mod.rs
pub mod geometry;
pub mod random;

pub use geometry::Point2D;
pub use random::RandomGenerator;
