//! # dungen
//!
//! Grows dungeon layout graphs from a seed room by repeatedly rewriting it
//! with graph-grammar rules until the result fits a size and spacing band.
//!
//! ```text
//! dungen [CONFIG.json] [--runs N]
//! ```
//!
//! Without `--runs` a single derivation is run and its graph printed. With
//! it, `N` derivations run in parallel and a summary is printed instead.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use log::info;

use dungen::generator::stats::{mean_generation_time_ms, success_rate};
use dungen::generator::{GeneratorConfig, ProceduralGenerator};

#[derive(Debug, Parser)]
#[command(name = "dungen", about = "Grow a dungeon layout graph from a seed room.")]
struct Cli {
    /// JSON generator config; defaults are used when omitted.
    config: Option<PathBuf>,

    /// Run this many derivations in parallel and print a summary.
    #[arg(long)]
    runs: Option<usize>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    info!("dungen starting...");

    let cli = Cli::parse();
    let mut generator = match &cli.config {
        Some(path) => {
            info!("loading config from {}", path.display());
            ProceduralGenerator::from_config_file(path)?
        }
        None => ProceduralGenerator::with_sample_rules(GeneratorConfig::default())?,
    };

    if let Some(runs) = cli.runs {
        let stats = generator.evaluate(runs)?;
        println!("runs:          {}", stats.len());
        println!("success rate:  {:.1}%", success_rate(&stats) * 100.0);
        println!("mean time:     {:.2} ms", mean_generation_time_ms(&stats));
        return Ok(());
    }

    let derivation = generator.generate()?;
    let graph = derivation.graph();
    match derivation.failure() {
        None => {
            println!("rules applied: {}", graph.generated_rules().join(", "));
            println!("iterations:    {}", graph.iteration);
            println!("nodes:         {}", graph.node_list().join(" "));
            println!("edges:         {}", graph.edge_list().join(" "));
            for node in graph.nodes() {
                println!(
                    "  {:>5} {:<6} ({:.0}, {:.0})",
                    node.id, node.node_type, node.pos.x, node.pos.y
                );
            }
        }
        Some(reason) => {
            println!("{} after {} iteration(s): {:?}", graph.name(), graph.iteration, reason);
        }
    }
    Ok(())
}
