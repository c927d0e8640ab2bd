//! Command-line runner for the fleet simulation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bevy_ecs::prelude::World;
use clap::{Parser, Subcommand};
use fleet_core::clock::ONE_HOUR_SECS;
use fleet_core::policy::{NearestVehiclePolicy, PolicyReport};
use fleet_core::runner::{run_tick, tick_schedule};
use fleet_core::scenario::{build_scenario, ScenarioParams};
use fleet_core::store::{CustomerStore, VehicleStore};
use fleet_core::telemetry::{CsvLogSink, SimTelemetry};
use fleet_core::telemetry_export::{write_scores_parquet, write_vehicle_events_parquet};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fleet_cli", about = "Run the fleet simulation and export its telemetry")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario with the nearest-vehicle policy
    Run {
        /// Scenario parameters as JSON; defaults are used for missing fields
        #[arg(long)]
        config: Option<PathBuf>,
        /// Simulated hours
        #[arg(long, default_value_t = 24)]
        hours: u64,
        /// Directory for CSV logs and parquet exports
        #[arg(long, default_value = "fleet_output")]
        out_dir: PathBuf,
        /// Override the scenario seed
        #[arg(long, env = "FLEET_SEED")]
        seed: Option<u64>,
        /// Let several customers share a vehicle
        #[arg(long)]
        pooling: bool,
        /// Let vehicles negotiate prices
        #[arg(long)]
        pricing: bool,
    },
    /// Print the default scenario parameters as JSON
    PrintConfig,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match Cli::parse().command {
        Commands::Run {
            config,
            hours,
            out_dir,
            seed,
            pooling,
            pricing,
        } => {
            let mut params = load_params(config.as_deref())?;
            if let Some(seed) = seed {
                params = params.with_seed(seed);
            }
            if pooling {
                params = params.with_pooling(true);
            }
            if pricing {
                params = params.with_pricing(true);
            }
            run(params, hours, &out_dir)
        }
        Commands::PrintConfig => {
            println!("{}", serde_json::to_string_pretty(&ScenarioParams::default())?);
            Ok(())
        }
    }
}

fn load_params(path: Option<&Path>) -> Result<ScenarioParams> {
    let Some(path) = path else {
        return Ok(ScenarioParams::default());
    };
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn run(params: ScenarioParams, hours: u64, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    let sink = CsvLogSink::create(out_dir.join("vehicle_events.csv"), out_dir.join("scores.csv"))?;

    let ticks = (hours * ONE_HOUR_SECS / params.timestep_secs.max(1)) as usize;
    let policy = NearestVehiclePolicy::from_params(&params);
    info!(hours, ticks, seed = params.seed, "starting run");

    let mut world = World::new();
    build_scenario(&mut world, params);
    world.resource_mut::<SimTelemetry>().set_sink(Box::new(sink));
    let mut schedule = tick_schedule();

    let bar = ProgressBar::new(ticks as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let mut totals = PolicyReport::default();
    for _ in 0..ticks {
        run_tick(&mut world, &mut schedule)?;
        let report = policy.run(&mut world)?;
        totals.requests += report.requests;
        totals.accepted += report.accepted;
        totals.rejected += report.rejected;
        totals.dispatched += report.dispatched;
        bar.inc(1);
    }
    bar.finish_with_message("done");

    let telemetry = world.resource::<SimTelemetry>();
    write_scores_parquet(out_dir.join("scores.parquet"), telemetry)?;
    write_vehicle_events_parquet(out_dir.join("vehicle_events.parquet"), telemetry)?;

    let earnings: f64 = telemetry.scores.iter().map(|s| s.earnings).sum::<f64>()
        + world.resource::<VehicleStore>().iter().map(|v| v.earnings()).sum::<f64>();
    println!(
        "Run OK | hours: {} | requests: {} | accepted: {} | rejected: {} | dispatched: {}",
        hours, totals.requests, totals.accepted, totals.rejected, totals.dispatched
    );
    println!(
        "Customers | arrived: {} | disappeared: {} | still in system: {}",
        telemetry.customers_arrived,
        telemetry.customers_disappeared,
        world.resource::<CustomerStore>().len()
    );
    println!(
        "Fleet | exited: {} | active: {} | earnings: {:.2} | sink errors: {}",
        telemetry.vehicles_exited,
        world.resource::<VehicleStore>().len(),
        earnings,
        telemetry.sink_errors()
    );
    println!("Output written to {}", out_dir.display());
    Ok(())
}
