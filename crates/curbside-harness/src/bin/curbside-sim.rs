//! Curbside simulation binary.
//!
//! # Usage
//!
//! ```bash
//! # One seeded run with three drivers
//! curbside-sim --seed 42 --drivers 3 --steps 2000
//!
//! # Sweep seeds with injected database failures
//! curbside-sim --seed 1 --runs 100 --chaos 0.05
//! ```

use clap::Parser;
use curbside_harness::{World, WorldConfig, WorldStats};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Curbside deterministic simulation
#[derive(Parser, Debug)]
#[command(name = "curbside-sim")]
#[command(about = "Run seeded passenger and driver sessions against a shared database")]
#[command(version)]
struct Args {
    /// Seed of the first run
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// Number of consecutive seeds to run
    #[arg(short, long, default_value = "1")]
    runs: u64,

    /// Drivers per world
    #[arg(short, long, default_value = "3")]
    drivers: usize,

    /// Steps per run
    #[arg(long, default_value = "1000")]
    steps: u64,

    /// Probability that a database read or write fails
    #[arg(long, default_value = "0.0")]
    chaos: f64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let mut total = WorldStats::default();
    for seed in args.seed..args.seed + args.runs {
        let config = WorldConfig {
            seed,
            drivers: args.drivers,
            chaos_rate: args.chaos,
            ..WorldConfig::default()
        };

        let mut world = World::new(config)?;
        if let Err(error) = world.run(args.steps) {
            tracing::error!(seed, %error, "simulation failed");
            return Err(error.into());
        }
        let stats = world.shutdown()?;
        tracing::info!(seed, ?stats, "run finished");

        total.steps += stats.steps;
        total.requested += stats.requested;
        total.claimed += stats.claimed;
        total.completed += stats.completed;
        total.cancelled += stats.cancelled;
        total.injected_failures += stats.injected_failures;
    }

    tracing::info!(runs = args.runs, ?total, "all runs passed");
    Ok(())
}
