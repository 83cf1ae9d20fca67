//! swarm-consensus - altitude consensus mission runner
//!
//! Flies one mission with simulated vehicles: every agent lifts off, holds
//! its initial target, converges with its path-graph neighbours every
//! consensus period, then lands and writes its mission log.
//!
//! # Usage
//!
//! ```bash
//! # Standard five-vehicle mission (45 s, 1 s time unit)
//! cargo run --release
//!
//! # Fast run: 50 ms time unit, 5 s of converging, noisy sensors
//! ./swarm-consensus --time-unit-ms 50 --duration 5 --noise 0.01 --seed 42
//!
//! # Print the effective configuration as TOML
//! ./swarm-consensus --dump-config
//! ```
//!
//! # Environment Variables
//!
//! - `SWARM_CONFIG`: Path to a mission TOML file
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use swarm_consensus::config::MissionConfig;
use swarm_consensus::mission::MissionRunner;
use swarm_consensus::storage::{write_mission_report, CsvLogSink, LogSink};
use swarm_consensus::vehicle::{SimulatedVehicle, Vehicle};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "swarm-consensus")]
#[command(about = "Distributed altitude averaging-consensus for small aerial vehicle swarms")]
#[command(version)]
struct CliArgs {
    /// Mission TOML file (overrides SWARM_CONFIG and ./mission_config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Converging phase duration in seconds
    #[arg(long, value_name = "SECS")]
    duration: Option<f64>,

    /// Length of one schedule time unit in milliseconds
    #[arg(long, value_name = "MS")]
    time_unit_ms: Option<u64>,

    /// Directory for mission logs and the report
    #[arg(short, long, value_name = "DIR", env = "SWARM_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Seed for simulated sensor noise
    #[arg(long)]
    seed: Option<u64>,

    /// Standard deviation of simulated sensor noise (m)
    #[arg(long, value_name = "STD")]
    noise: Option<f64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    dump_config: bool,
}

impl CliArgs {
    /// Load the base configuration and apply command-line overrides.
    fn mission_config(&self) -> Result<MissionConfig> {
        let mut config = match &self.config {
            Some(path) => MissionConfig::load_from_file(path)
                .with_context(|| format!("Failed to load mission config {}", path.display()))?,
            None => MissionConfig::load(),
        };

        if let Some(duration) = self.duration {
            config.mission.duration_secs = duration;
        }
        if let Some(time_unit_ms) = self.time_unit_ms {
            config.timing.time_unit_ms = time_unit_ms;
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir.clone_from(dir);
        }
        if let Some(seed) = self.seed {
            config.simulation.seed = Some(seed);
        }
        if let Some(noise) = self.noise {
            config.simulation.noise_std = noise;
        }

        config
            .validate()
            .context("Invalid mission configuration after command-line overrides")?;
        Ok(config)
    }
}

// ============================================================================
// Logging
// ============================================================================

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

// ============================================================================
// Vehicles
// ============================================================================

/// One simulated vehicle per configured agent, ordered by index.
fn simulated_vehicles(config: &MissionConfig) -> Vec<Vehicle> {
    let settings = config.simulation.settings(config.sensor.sample_period_ms);
    config
        .agents_by_index()
        .iter()
        .map(|agent| SimulatedVehicle::new(agent.index, settings.clone()).build())
        .collect()
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.json_logs);

    let config = args.mission_config()?;

    if args.dump_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Swarm Consensus - {}", config.mission.name);
    info!(
        "  {} agents | consensus every {} x {} ms | {:.1} s mission",
        config.agent_count(),
        config.timing.consensus_period,
        config.timing.time_unit_ms,
        config.mission.duration_secs
    );
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // Graceful shutdown via Ctrl+C: every agent lands and persists its log
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        warn!("Received Ctrl+C, landing all agents...");
        shutdown_token.cancel();
    });

    let sink: Arc<dyn LogSink> = Arc::new(CsvLogSink::new(
        config.output.dir.clone(),
        config.output.file_prefix.clone(),
    ));
    let vehicles = simulated_vehicles(&config);
    let runner = MissionRunner::new(config);

    let report = runner
        .run(vehicles, sink, cancel_token)
        .await
        .context("Mission could not start")?;

    let output = &runner.config().output;
    if output.write_report {
        let path = output.report_path();
        if let Err(e) = write_mission_report(&path, &report) {
            error!(path = %path.display(), error = %e, "Failed to write mission report");
        }
    }

    for (index, reason) in report.failed_agents() {
        error!(agent = index, %reason, "agent failed");
    }
    if report.is_success() {
        info!("{}", report.summary());
        Ok(())
    } else {
        Err(anyhow::anyhow!(report.summary()))
    }
}
