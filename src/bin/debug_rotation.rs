//! Debug script to print the full damage log of one iteration
//!
//! Usage: debug_rotation [CONFIG] [STRATEGY] [TARGETS] [SEED]

use mw_sim::config::SimConfig;
use mw_sim::simulation::{run_simulation_with_seed, Scenario};
use std::env;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mw_sim=info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    let config = match args.get(1).filter(|p| p.as_str() != "-") {
        Some(path) => match SimConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        },
        None => SimConfig::default(),
    };
    let strategy_name = args.get(2).map(String::as_str).unwrap_or("ST");
    let num_targets: u32 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(1);
    let seed: u64 = args
        .get(4)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| config.encounter.resolve_seed());

    let strategy = match config.strategy(strategy_name) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    let catalog = config.catalog();
    let scenario = Scenario {
        strategy: &strategy,
        catalog: &catalog,
        character: config.character,
        talents: config.talents(),
        num_targets,
        duration: config.encounter.duration,
    };

    let result = match run_simulation_with_seed(&scenario, seed) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Simulation failed: {}", e);
            std::process::exit(1);
        }
    };

    println!("\n=== {} @ {} target(s), seed {} ===", strategy.name, num_targets, seed);
    println!("Talents:");
    for (talent, rank) in config.talents().iter() {
        println!("  {} ({})", talent, rank);
    }
    println!();
    for hit in &result.history {
        println!("  {:>8.3}s  {:<28} {:>10}", hit.time, hit.source.to_string(), hit.amount);
    }
    println!();
    println!("Casts:  {}", result.casts);
    println!("Damage: {}", result.damage);
    println!("Time:   {:.3}s", result.time);
    println!("DPS:    {:.1}", result.dps());
}
