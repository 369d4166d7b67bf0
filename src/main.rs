use anyhow::Result;
use clap::Parser;
use log::info;
use std::time::Duration;

use traffic_gate::simulation::{GateConfig, SimConfig, SimWorld};

#[derive(Parser)]
#[command(name = "traffic_gate")]
#[command(about = "Vehicles queuing for a single traffic-light intersection")]
struct Cli {
    /// Number of vehicles competing for the intersection
    #[arg(long, default_value = "10")]
    vehicles: usize,

    /// Time each vehicle spends inside the intersection, in milliseconds
    #[arg(long, default_value = "20")]
    crossing_ms: u64,

    /// Base length of a traffic light phase, in milliseconds
    #[arg(long, default_value = "50")]
    light_ms: u64,

    /// Idle wait of the coordination loop, in milliseconds
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u64).range(1..))]
    poll_ms: u64,

    /// Maximum number of vehicles allowed to wait in line
    #[arg(long)]
    capacity: Option<usize>,

    /// Seed for reproducible light timing
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut gate = GateConfig::default().with_poll_interval(Duration::from_millis(cli.poll_ms));
    if let Some(capacity) = cli.capacity {
        gate = gate.with_line_capacity(capacity);
    }

    let config = SimConfig {
        vehicles: cli.vehicles,
        crossing_time: Duration::from_millis(cli.crossing_ms),
        light_phase: Duration::from_millis(cli.light_ms),
        gate,
        seed: cli.seed,
    };

    info!(
        "Running {} vehicles through one intersection (crossing {}ms, light phase {}ms)",
        config.vehicles, cli.crossing_ms, cli.light_ms
    );

    let stats = SimWorld::new(config).run()?;
    stats.log_summary();
    Ok(())
}
