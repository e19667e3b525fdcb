//! CLI entry point for the Mistweaver rotation simulator

use clap::{Parser, ValueEnum};
use mw_sim::{
    config::SimConfig,
    error::Result,
    simulation::{FastRng, Scenario, Simulation},
    stats::SourceBreakdown,
    sweep::{run_sweep, SweepResult},
};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "mw-sim")]
#[command(version = "0.1")]
#[command(about = "Monte-Carlo DPS simulator for Mistweaver Monk rotations", long_about = None)]
struct Args {
    /// Path to the configuration file (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target counts to simulate (repeatable); overrides the config
    #[arg(long = "targets")]
    targets: Vec<u32>,

    /// Encounter length in seconds
    #[arg(short, long)]
    duration: Option<f64>,

    /// Iterations per simulation
    #[arg(short = 'n', long)]
    iterations: Option<usize>,

    /// RNG seed; random when neither this nor the config sets one
    #[arg(short, long)]
    seed: Option<u64>,

    /// Run a single strategy instead of the talent sweep
    #[arg(long)]
    strategy: Option<String>,

    /// Use parallel processing
    #[arg(short, long, default_value = "false")]
    parallel: bool,

    /// Worker threads for --parallel (defaults to all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Show timing information
    #[arg(short, long, default_value = "false")]
    timing: bool,

    /// Print per-source damage of the best iteration
    #[arg(short, long, default_value = "false")]
    breakdown: bool,
}

/// Result of a single-strategy run at one target count
#[derive(serde::Serialize)]
struct StrategyReport {
    targets: u32,
    strategy: String,
    stats: mw_sim::AggregatedStats,
    breakdown: Vec<SourceBreakdown>,
}

fn load_config(args: &Args) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => SimConfig::from_file(path)?,
        None => SimConfig::default(),
    };

    if !args.targets.is_empty() {
        config.encounter.targets = args.targets.clone();
    }
    if let Some(duration) = args.duration {
        config.encounter.duration = duration;
    }
    if let Some(iterations) = args.iterations {
        config.encounter.iterations = iterations;
    }
    if args.seed.is_some() {
        config.encounter.seed = args.seed;
    }
    config.validate()?;
    Ok(config)
}

fn run_strategy(config: &SimConfig, name: &str, seed: u64, parallel: bool) -> Result<Vec<StrategyReport>> {
    let strategy = config.strategy(name)?;
    let catalog = config.catalog();

    config
        .encounter
        .targets
        .iter()
        .map(|&num_targets| {
            let scenario = Scenario {
                strategy: &strategy,
                catalog: &catalog,
                character: config.character,
                talents: config.talents(),
                num_targets,
                duration: config.encounter.duration,
            };
            let mut sim = Simulation::new(scenario, config.encounter.iterations);
            if parallel {
                sim.run_parallel(seed)?;
            } else {
                sim.run(&mut FastRng::new(seed))?;
            }

            Ok(StrategyReport {
                targets: num_targets,
                strategy: strategy.name.clone(),
                stats: sim.stats(),
                breakdown: sim.best_iteration().map(|b| b.breakdown()).unwrap_or_default(),
            })
        })
        .collect()
}

fn print_breakdown(breakdown: &[SourceBreakdown]) {
    for entry in breakdown {
        println!(
            "    {:<28} {:>12} dmg  {:>5}x  {:>10.1} dps",
            entry.source.to_string(),
            entry.damage,
            entry.count,
            entry.dps
        );
    }
}

fn print_strategy_reports(reports: &[StrategyReport], show_breakdown: bool) {
    println!("=== Strategy Results ===");
    for report in reports {
        let s = &report.stats;
        println!();
        println!("{} target(s), {}", report.targets, report.strategy);
        println!("  Average DPS: {:.1} ± {:.1}", s.avg_dps, s.std_dps);
        println!("  DPS Range:   {:.1} - {:.1}", s.min_dps, s.max_dps);
        println!("  Best / Median / Worst: {:.1} / {:.1} / {:.1}", s.best_dps, s.median_dps, s.worst_dps);
        println!("  Average Damage: {:.0} over {:.2}s", s.avg_damage, s.avg_time);
        if show_breakdown {
            println!("  Best iteration by source:");
            print_breakdown(&report.breakdown);
        }
    }
}

fn print_sweep(results: &[Vec<SweepResult>], show_breakdown: bool) {
    println!("=== Talent Sweep Results ===");
    for ranked in results {
        let Some(first) = ranked.first() else {
            continue;
        };
        println!();
        println!("--- {} target(s) ---", first.num_targets);
        for (rank, r) in ranked.iter().enumerate() {
            println!(
                "{:>3}. {:>10.1} dps  [{}]  {}",
                rank + 1,
                r.stats.avg_dps,
                r.strategy,
                r.combo.label()
            );
        }
        if show_breakdown {
            println!("  Best iteration of the top build:");
            print_breakdown(&first.best.breakdown());
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let seed = config.encounter.resolve_seed();

    if args.parallel {
        let threads = args.threads.unwrap_or_else(num_cpus::get);
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
            tracing::warn!("could not size thread pool: {}", e);
        }
    }
    tracing::info!(seed, iterations = config.encounter.iterations, "starting");

    let start = Instant::now();
    let total_iterations;

    match &args.strategy {
        Some(name) => {
            let reports = run_strategy(&config, name, seed, args.parallel)?;
            total_iterations = reports.len() * config.encounter.iterations;
            match args.output {
                OutputFormat::Text => print_strategy_reports(&reports, args.breakdown),
                OutputFormat::Json => {
                    let output = serde_json::json!({
                        "seed": seed,
                        "duration": config.encounter.duration,
                        "iterations": config.encounter.iterations,
                        "results": reports,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }
        }
        None => {
            let results = config
                .encounter
                .targets
                .iter()
                .map(|&n| run_sweep(&config, n, seed, args.parallel))
                .collect::<Result<Vec<_>>>()?;
            total_iterations = results.iter().map(Vec::len).sum::<usize>() * config.encounter.iterations;
            match args.output {
                OutputFormat::Text => print_sweep(&results, args.breakdown),
                OutputFormat::Json => {
                    let output = serde_json::json!({
                        "seed": seed,
                        "duration": config.encounter.duration,
                        "iterations": config.encounter.iterations,
                        "sweeps": results,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    if args.timing {
        let secs = elapsed.as_secs_f64();
        eprintln!();
        eprintln!("--- Performance ---");
        eprintln!("Total time: {:.3}s", secs);
        if total_iterations > 0 {
            eprintln!("Per iteration: {:.3}ms", secs * 1000.0 / total_iterations as f64);
            eprintln!("Iterations/sec: {:.0}", total_iterations as f64 / secs);
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mw_sim=info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
