use std::process::{Command, Output};
use std::time::{Duration, Instant};

use traffic_gate::simulation::{GateConfig, SimConfig, SimWorld};

fn run_binary(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_traffic_gate"))
        .args(args)
        .env("RUST_LOG", "warn,traffic_gate=info")
        .output()
        .expect("Failed to execute simulation")
}

/// Pull the number after `label` out of a log line
fn logged_value(stderr: &str, label: &str) -> f32 {
    let line = stderr
        .lines()
        .find(|line| line.contains(label))
        .unwrap_or_else(|| panic!("Could not find '{}' line in: {}", label, stderr));
    let parts: Vec<&str> = line.split(label).collect();
    parts
        .get(1)
        .map(|s| s.trim().trim_end_matches('%'))
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("Could not parse value from line: {}", line))
}

/// Test that the demo binary runs to completion and logs its statistics
#[test]
fn test_binary_runs_and_logs_statistics() {
    let output = run_binary(&[
        "--vehicles",
        "6",
        "--crossing-ms",
        "2",
        "--light-ms",
        "10",
        "--seed",
        "7",
    ]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        output.status.success(),
        "Simulation failed to run. stderr: {}",
        stderr
    );
    assert!(
        stderr.contains("SIMULATION COMPLETE"),
        "Simulation did not complete properly. stderr: {}",
        stderr
    );

    assert_eq!(logged_value(&stderr, "Vehicles spawned:"), 6.0);
    assert_eq!(logged_value(&stderr, "Vehicles crossed:"), 6.0);
    assert_eq!(logged_value(&stderr, "Max vehicles inside:"), 1.0);
    assert_eq!(logged_value(&stderr, "Success rate:"), 100.0);
}

/// Test that every vehicle crosses exactly once and never alongside another
#[test]
fn test_world_run_serializes_vehicles() {
    let config = SimConfig {
        vehicles: 12,
        crossing_time: Duration::from_millis(2),
        light_phase: Duration::from_millis(10),
        seed: Some(42),
        ..SimConfig::default()
    };

    let stats = SimWorld::new(config).run().expect("simulation should finish");

    assert_eq!(stats.vehicles_spawned, 12);
    assert_eq!(stats.vehicles_crossed, 12);
    assert_eq!(stats.vehicles_turned_away, 0);
    assert_eq!(stats.max_inside, 1);

    let mut order = stats.admission_order.clone();
    order.sort();
    order.dedup();
    assert_eq!(order.len(), 12, "a vehicle was admitted twice");
}

/// Test that a tiny line turns surplus vehicles away instead of hanging
#[test]
fn test_world_with_line_capacity_turns_vehicles_away() {
    let config = SimConfig {
        vehicles: 20,
        crossing_time: Duration::from_millis(20),
        light_phase: Duration::from_millis(10),
        gate: GateConfig::default().with_line_capacity(1),
        seed: Some(3),
    };

    let stats = SimWorld::new(config).run().expect("simulation should finish");

    assert_eq!(stats.vehicles_spawned, 20);
    assert_eq!(stats.vehicles_crossed + stats.vehicles_turned_away, 20);
    assert!(stats.vehicles_crossed >= 1);
    assert_eq!(stats.max_inside, 1);
}

/// Test that a long light phase does not hold up the end of the run
#[test]
fn test_world_run_returns_without_waiting_for_light_phase() {
    for vehicles in [0, 1] {
        let config = SimConfig {
            vehicles,
            crossing_time: Duration::from_millis(1),
            light_phase: Duration::from_secs(60),
            seed: Some(1),
            ..SimConfig::default()
        };
        let world = SimWorld::new(config);
        assert_eq!(world.gate().line_len(), 0);
        assert!(!world.gate().is_closed());

        let started = Instant::now();
        let stats = world.run().expect("simulation should finish");

        assert!(
            started.elapsed() < Duration::from_secs(10),
            "run took {:?}",
            started.elapsed()
        );
        assert_eq!(stats.vehicles_crossed, vehicles);
        assert_eq!(stats.light_changes, 0);
    }
}

/// Test that a zero poll interval is rejected on the command line
#[test]
fn test_binary_rejects_zero_poll_interval() {
    let output = run_binary(&["--vehicles", "1", "--poll-ms", "0"]);

    assert!(!output.status.success(), "--poll-ms 0 should be rejected");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--poll-ms"), "unexpected stderr: {}", stderr);
}
