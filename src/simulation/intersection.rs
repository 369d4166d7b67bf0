//! Admission gate for a shared intersection
//!
//! Vehicles line up with `request_entry` and block on the returned ticket.
//! A single coordination loop lets the head of the line in whenever the
//! intersection is free and the light is green. The admitted vehicle hands
//! its `Admission` back through `report_departure` once it has crossed.
//!
//! Occupied goes false -> true only in the coordination step and
//! true -> false only in `report_departure`. Both run under the same lock,
//! together with the line-head and light checks.

use log::{debug, info, warn};
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::error::GateError;
use super::traffic_light::TrafficLight;
use super::types::{AdmissionToken, IntersectionId, VehicleId};

/// Default idle wait of the coordination loop between light checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Tuning knobs for a gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// How long the coordination loop sleeps when it cannot admit anyone.
    /// Arrivals, departures and `close` wake it early.
    pub poll_interval: Duration,
    /// Maximum number of waiting vehicles, `None` for unbounded
    pub line_capacity: Option<usize>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            line_capacity: None,
        }
    }
}

impl GateConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_line_capacity(mut self, capacity: usize) -> Self {
        self.line_capacity = Some(capacity);
        self
    }
}

/// Permission to occupy the intersection
///
/// Not `Clone`: it is handed out once and must be returned once.
#[derive(Debug, PartialEq, Eq)]
pub struct Admission {
    gate: IntersectionId,
    vehicle: VehicleId,
    token: AdmissionToken,
}

impl Admission {
    pub fn gate(&self) -> IntersectionId {
        self.gate
    }

    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }

    pub fn token(&self) -> AdmissionToken {
        self.token
    }
}

/// A place in the waiting line
///
/// Dropping the ticket before admission gives the place up.
#[derive(Debug)]
pub struct EntryTicket {
    gate: IntersectionId,
    vehicle: VehicleId,
    signal: Receiver<Admission>,
}

impl EntryTicket {
    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }

    /// Block until the coordination loop admits this vehicle
    pub fn wait(self) -> Result<Admission, GateError> {
        self.signal
            .recv()
            .map_err(|_| GateError::Closed { gate: self.gate })
    }

    /// Block for at most `timeout`; the place in line is kept on timeout
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Admission, GateError> {
        match self.signal.recv_timeout(timeout) {
            Ok(admission) => Ok(admission),
            Err(RecvTimeoutError::Timeout) => Err(GateError::Timeout {
                gate: self.gate,
                vehicle: self.vehicle,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(GateError::Closed { gate: self.gate }),
        }
    }

    /// Check for admission without blocking
    pub fn try_admission(&self) -> Result<Option<Admission>, GateError> {
        match self.signal.try_recv() {
            Ok(admission) => Ok(Some(admission)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(GateError::Closed { gate: self.gate }),
        }
    }
}

#[derive(Debug)]
struct LineEntry {
    vehicle: VehicleId,
    signal: Sender<Admission>,
}

#[derive(Debug, Clone, Copy)]
struct Occupant {
    vehicle: VehicleId,
    token: AdmissionToken,
}

#[derive(Debug, Default)]
struct GateState {
    occupant: Option<Occupant>,
    line: VecDeque<LineEntry>,
    closed: bool,
    coordinator_running: bool,
    next_token: u64,
}

/// Serializes access to one intersection
pub struct IntersectionGate {
    id: IntersectionId,
    light: Arc<dyn TrafficLight>,
    config: GateConfig,
    state: Mutex<GateState>,
    wake: Condvar,
}

impl std::fmt::Debug for IntersectionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntersectionGate")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("state", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl IntersectionGate {
    pub fn new(id: IntersectionId, light: Arc<dyn TrafficLight>, config: GateConfig) -> Self {
        Self {
            id,
            light,
            config,
            state: Mutex::new(GateState::default()),
            wake: Condvar::new(),
        }
    }

    pub fn id(&self) -> IntersectionId {
        self.id
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Number of vehicles waiting, not counting the admitted one
    pub fn line_len(&self) -> usize {
        self.lock().line.len()
    }

    pub fn is_occupied(&self) -> bool {
        self.lock().occupant.is_some()
    }

    pub fn admitted_vehicle(&self) -> Option<VehicleId> {
        self.lock().occupant.map(|occupant| occupant.vehicle)
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn light_is_green(&self) -> bool {
        self.light.is_green()
    }

    /// Join the back of the waiting line
    ///
    /// Returns immediately. The caller suspends on the returned ticket.
    pub fn request_entry(&self, vehicle: VehicleId) -> Result<EntryTicket, GateError> {
        let mut state = self.lock();
        if state.closed {
            return Err(GateError::Closed { gate: self.id });
        }
        if let Some(capacity) = self.config.line_capacity {
            if state.line.len() >= capacity {
                return Err(GateError::LineFull {
                    gate: self.id,
                    capacity,
                });
            }
        }

        let (signal, receiver) = mpsc::channel();
        state.line.push_back(LineEntry { vehicle, signal });
        let position = state.line.len();
        drop(state);
        self.wake.notify_all();

        debug!("{} queued at {} (position {})", vehicle, self.id, position);
        Ok(EntryTicket {
            gate: self.id,
            vehicle,
            signal: receiver,
        })
    }

    /// Free the intersection for the next vehicle
    ///
    /// The admission must be the one this gate handed out most recently.
    /// Anything else is rejected and the gate state is left untouched.
    pub fn report_departure(&self, admission: Admission) -> Result<(), GateError> {
        let mut state = self.lock();
        match state.occupant {
            Some(occupant) if admission.gate == self.id && occupant.token == admission.token => {
                state.occupant = None;
                drop(state);
                self.wake.notify_all();
                debug!("{} left {}", admission.vehicle, self.id);
                Ok(())
            }
            _ => {
                warn!(
                    "{} reported leaving {} without holding it",
                    admission.vehicle, self.id
                );
                Err(GateError::NotAdmitted {
                    gate: self.id,
                    vehicle: admission.vehicle,
                })
            }
        }
    }

    /// Run one coordination step
    ///
    /// Admits the head of the line if the intersection is free and the light
    /// is green. Returns the admitted vehicle, if any.
    pub fn admit_next(&self) -> Option<VehicleId> {
        let mut state = self.lock();
        self.admit_locked(&mut state)
    }

    /// Keep admitting vehicles until the gate is closed
    pub fn run_coordination_loop(&self) {
        let mut state = self.lock();
        while !state.closed {
            self.admit_locked(&mut state);
            let (guard, _) = self
                .wake
                .wait_timeout(state, self.config.poll_interval)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    /// Spawn the coordination loop on its own thread
    pub fn start(self: &Arc<Self>) -> Result<Coordinator, GateError> {
        {
            let mut state = self.lock();
            if state.closed {
                return Err(GateError::Closed { gate: self.id });
            }
            if state.coordinator_running {
                return Err(GateError::AlreadyRunning { gate: self.id });
            }
            state.coordinator_running = true;
        }

        let gate = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("gate-{}", self.id.0 .0))
            .spawn(move || {
                debug!("coordination loop for {} started", gate.id);
                gate.run_coordination_loop();
                debug!("coordination loop for {} stopped", gate.id);
            });

        match spawned {
            Ok(handle) => Ok(Coordinator {
                gate: Arc::clone(self),
                handle: Some(handle),
            }),
            Err(e) => {
                self.lock().coordinator_running = false;
                Err(GateError::Spawn(e))
            }
        }
    }

    /// Stop accepting vehicles and release everyone still waiting
    ///
    /// Waiting vehicles wake with `GateError::Closed`. The currently
    /// admitted vehicle may still report its departure.
    pub fn close(&self) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let abandoned: Vec<LineEntry> = state.line.drain(..).collect();
        drop(state);
        self.wake.notify_all();

        info!(
            "{} closed, {} waiting vehicle(s) turned away",
            self.id,
            abandoned.len()
        );
    }

    fn admit_locked(&self, state: &mut GateState) -> Option<VehicleId> {
        if state.closed || state.occupant.is_some() {
            return None;
        }

        while !state.line.is_empty() && self.light.is_green() {
            let entry = state.line.pop_front()?;
            let token = AdmissionToken(state.next_token);
            state.next_token += 1;

            let admission = Admission {
                gate: self.id,
                vehicle: entry.vehicle,
                token,
            };
            if entry.signal.send(admission).is_err() {
                // Requester dropped its ticket; nobody would report back.
                warn!("{} gave up its place at {}", entry.vehicle, self.id);
                continue;
            }

            state.occupant = Some(Occupant {
                vehicle: entry.vehicle,
                token,
            });
            debug!("{} admitted to {}", entry.vehicle, self.id);
            return Some(entry.vehicle);
        }
        None
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the coordination thread of a started gate
///
/// Shutting down (or dropping) closes the gate and joins the thread.
#[derive(Debug)]
pub struct Coordinator {
    gate: Arc<IntersectionGate>,
    handle: Option<JoinHandle<()>>,
}

impl Coordinator {
    pub fn gate(&self) -> &Arc<IntersectionGate> {
        &self.gate
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.gate.close();
        if handle.join().is_err() {
            warn!("coordination thread for {} panicked", self.gate.id);
        }
        self.gate.lock().coordinator_running = false;
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}
