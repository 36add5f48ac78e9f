// src/lib.rs

pub mod error;
pub mod generator;
pub mod grammar;
pub mod graph;
pub mod utils;
