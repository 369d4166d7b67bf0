//! Demo world that drives one gate with real threads
//!
//! One thread per vehicle, one coordination thread for the gate and one
//! thread cycling the light. Vehicles report what happens to them on a
//! shared `BlockingQueue`, which the caller of `run` drains to build the
//! statistics.

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::blocking_queue::BlockingQueue;
use super::error::GateError;
use super::intersection::{EntryTicket, GateConfig, IntersectionGate};
use super::traffic_light::{LightPhase, SignalLight};
use super::types::{IntersectionId, SimId, VehicleId};

/// Minimum time the run loop waits for any vehicle activity before giving up
const MIN_STALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Settings for a demo run
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of vehicle threads to spawn
    pub vehicles: usize,
    /// How long an admitted vehicle stays inside the intersection
    pub crossing_time: Duration,
    /// Base length of a light phase; each phase lasts 1x to 1.5x this
    pub light_phase: Duration,
    pub gate: GateConfig,
    /// Seed for reproducible light timing
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            vehicles: 10,
            crossing_time: Duration::from_millis(20),
            light_phase: Duration::from_millis(50),
            gate: GateConfig::default(),
            seed: None,
        }
    }
}

/// What a vehicle reports back to the world
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEvent {
    Admitted(VehicleId),
    Departed(VehicleId),
    /// The vehicle never got in (line full or gate closed)
    TurnedAway(VehicleId),
}

/// Outcome of a demo run
#[derive(Debug, Clone, Default)]
pub struct SimStats {
    pub vehicles_spawned: usize,
    pub vehicles_crossed: usize,
    pub vehicles_turned_away: usize,
    /// Highest number of vehicles seen inside at once; anything above 1 is a bug
    pub max_inside: usize,
    pub admission_order: Vec<VehicleId>,
    pub light_changes: usize,
    pub elapsed: Duration,
}

impl SimStats {
    pub fn success_rate(&self) -> f32 {
        if self.vehicles_spawned == 0 {
            return 0.0;
        }
        self.vehicles_crossed as f32 / self.vehicles_spawned as f32 * 100.0
    }

    pub fn log_summary(&self) {
        info!("=== SIMULATION COMPLETE ===");
        info!("Elapsed time: {:.2}s", self.elapsed.as_secs_f32());
        info!("Vehicles spawned: {}", self.vehicles_spawned);
        info!("Vehicles crossed: {}", self.vehicles_crossed);
        info!("Vehicles turned away: {}", self.vehicles_turned_away);
        info!("Max vehicles inside: {}", self.max_inside);
        info!("Light changes: {}", self.light_changes);
        info!("Success rate: {:.1}%", self.success_rate());
    }
}

/// One intersection, its light and the vehicles queuing for it
pub struct SimWorld {
    config: SimConfig,
    light: Arc<SignalLight>,
    gate: Arc<IntersectionGate>,
    events: Arc<BlockingQueue<GateEvent>>,
    rng: StdRng,
}

impl SimWorld {
    pub fn new(config: SimConfig) -> Self {
        let light = Arc::new(SignalLight::new(LightPhase::Green));
        let gate = Arc::new(IntersectionGate::new(
            IntersectionId(SimId(0)),
            light.clone(),
            config.gate.clone(),
        ));
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        Self {
            config,
            light,
            gate,
            events: Arc::new(BlockingQueue::new()),
            rng,
        }
    }

    pub fn gate(&self) -> &Arc<IntersectionGate> {
        &self.gate
    }

    /// Run every vehicle through the intersection and collect statistics
    pub fn run(mut self) -> Result<SimStats> {
        let started = Instant::now();
        let coordinator = self
            .gate
            .start()
            .context("Failed to start coordination loop")?;

        let mut light_cycle = self.spawn_light_cycle()?;

        info!("=== SPAWNING {} VEHICLES ===", self.config.vehicles);
        let mut vehicles = Vec::with_capacity(self.config.vehicles);
        for index in 0..self.config.vehicles {
            vehicles.push(self.spawn_vehicle(VehicleId(SimId(index)))?);
        }

        let mut stats = self.collect_events()?;

        for handle in vehicles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Vehicle did not cross: {}", e),
                Err(_) => bail!("Vehicle thread panicked"),
            }
        }

        stats.light_changes = light_cycle.stop()?;
        coordinator.shutdown();

        stats.vehicles_spawned = self.config.vehicles;
        stats.elapsed = started.elapsed();
        Ok(stats)
    }

    fn spawn_vehicle(&self, id: VehicleId) -> Result<JoinHandle<Result<(), GateError>>> {
        let gate = self.gate.clone();
        let events = self.events.clone();
        let crossing_time = self.config.crossing_time;

        thread::Builder::new()
            .name(format!("vehicle-{}", id.0 .0))
            .spawn(move || {
                let admission = match gate.request_entry(id).and_then(EntryTicket::wait) {
                    Ok(admission) => admission,
                    Err(e) => {
                        events.push(GateEvent::TurnedAway(id));
                        return Err(e);
                    }
                };

                events.push(GateEvent::Admitted(id));
                thread::sleep(crossing_time);
                // Announce before releasing so the next Admitted can't overtake it
                events.push(GateEvent::Departed(id));
                gate.report_departure(admission)
            })
            .with_context(|| format!("Failed to spawn thread for {}", id))
    }

    fn spawn_light_cycle(&mut self) -> Result<LightCycle> {
        let light = self.light.clone();
        let base = self.config.light_phase;
        let mut rng = StdRng::seed_from_u64(self.rng.random());
        let (stop, stopped) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("light-cycle".to_string())
            .spawn(move || {
                let mut changes = 0;
                loop {
                    let factor: f32 = rng.random_range(1.0..1.5);
                    let phase_len = Duration::try_from_secs_f32(base.as_secs_f32() * factor)
                        .unwrap_or(Duration::MAX);
                    match stopped.recv_timeout(phase_len) {
                        Err(RecvTimeoutError::Timeout) => {
                            let phase = light.toggle();
                            debug!("Light turned {:?}", phase);
                            changes += 1;
                        }
                        _ => break,
                    }
                }
                changes
            })
            .context("Failed to spawn light thread")?;

        Ok(LightCycle {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    fn collect_events(&self) -> Result<SimStats> {
        let stall_timeout = MIN_STALL_TIMEOUT.max(
            self.config
                .light_phase
                .saturating_mul(4)
                .saturating_add(self.config.crossing_time.saturating_mul(4)),
        );
        let mut stats = SimStats::default();
        let mut inside = 0usize;
        let mut finished = 0;

        while finished < self.config.vehicles {
            let Some(event) = self.events.pop_timeout(stall_timeout) else {
                bail!(
                    "No vehicle activity for {:?} ({} of {} vehicles finished)",
                    stall_timeout,
                    finished,
                    self.config.vehicles
                );
            };

            match event {
                GateEvent::Admitted(id) => {
                    inside += 1;
                    stats.max_inside = stats.max_inside.max(inside);
                    stats.admission_order.push(id);
                    if inside > 1 {
                        warn!("{} admitted while {} vehicle(s) inside", id, inside - 1);
                    }
                }
                GateEvent::Departed(_) => {
                    inside = inside.saturating_sub(1);
                    stats.vehicles_crossed += 1;
                    finished += 1;
                }
                GateEvent::TurnedAway(_) => {
                    stats.vehicles_turned_away += 1;
                    finished += 1;
                }
            }
        }

        Ok(stats)
    }
}

/// The light-cycle thread; stopped and joined on drop
struct LightCycle {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<usize>>,
}

impl LightCycle {
    /// Interrupt the current phase and return how often the light changed
    fn stop(&mut self) -> Result<usize> {
        drop(self.stop.take());
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| anyhow::anyhow!("Light thread panicked")),
            None => Ok(0),
        }
    }
}

impl Drop for LightCycle {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("{}", e);
        }
    }
}
