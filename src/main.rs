//! Hive Colony - headless colony runner
//!
//! Founds a colony, runs it on the autopilot for a number of ticks and
//! prints periodic reports as text or a JSON summary.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use hive_colony::core::config::ColonyConfig;
use hive_colony::core::error::{ColonyError, Result};
use hive_colony::simulation::{Colony, ColonyReport};

/// Run a bee colony without a renderer
#[derive(Parser, Debug)]
#[command(name = "hive-colony")]
#[command(about = "Run a bee colony simulation headless and report on it")]
struct Args {
    /// Number of ticks to simulate
    #[arg(long, default_value_t = 36_000)]
    ticks: u64,

    /// Milliseconds per tick
    #[arg(long, default_value_t = 16.0)]
    dt_ms: f32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// TOML file overriding the default colony configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report every this many ticks (0 disables periodic reports)
    #[arg(long, default_value_t = 3_600)]
    report_every: u64,

    /// Output format: text or json
    #[arg(long, default_value = "text")]
    format: String,

    /// Log simulation decisions
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// JSON output structure
#[derive(Serialize)]
struct RunSummary {
    seed: u64,
    ticks: u64,
    dt_ms: f32,
    reports: Vec<ColonyReport>,
    final_report: ColonyReport,
    event_counts: BTreeMap<&'static str, usize>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "hive_colony=debug"
    } else {
        "hive_colony=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let json = match args.format.as_str() {
        "json" => true,
        "text" => false,
        other => {
            return Err(ColonyError::InvalidConfig(format!(
                "unknown output format '{}', expected text or json",
                other
            )))
        }
    };

    let config = match &args.config {
        Some(path) => ColonyConfig::load(path)?,
        None => ColonyConfig::default(),
    };

    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, ticks = args.ticks, dt_ms = args.dt_ms, "starting colony");

    let mut colony = Colony::founded(config, seed)?;
    let mut reports = Vec::new();
    let mut event_counts: BTreeMap<&'static str, usize> = BTreeMap::new();

    for tick in 1..=args.ticks {
        for event in colony.tick(args.dt_ms) {
            *event_counts.entry(event.kind()).or_default() += 1;
        }

        if args.report_every > 0 && tick % args.report_every == 0 {
            let report = colony.report();
            if !json {
                print_report(&report);
            }
            reports.push(report);
        }

        if colony.population().is_empty() {
            tracing::warn!(tick, "the colony has died out");
            break;
        }
    }

    let final_report = colony.report();
    if json {
        let summary = RunSummary {
            seed,
            ticks: colony.current_tick(),
            dt_ms: args.dt_ms,
            reports,
            final_report,
            event_counts,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("--- final ---");
        print_report(&final_report);
        println!("events:");
        for (kind, count) in &event_counts {
            println!("  {:<22} {}", kind, count);
        }
    }

    Ok(())
}

fn print_report(report: &ColonyReport) {
    println!(
        "[t={:>7.1}s tick {:>6}] workers {:>3} foragers {:>3} | honey {:>4} nectar {:>4} water {:>4} | larvae {} (hungry {}, digesting {}) | flowers {} | energy {:.1}",
        report.elapsed_secs,
        report.tick,
        report.workers,
        report.foragers,
        report.ledger.honey,
        report.ledger.nectar,
        report.ledger.water,
        report.brood.growing,
        report.brood.awaiting_food,
        report.brood.digesting,
        report.flowers,
        report.mean_energy,
    );
}
