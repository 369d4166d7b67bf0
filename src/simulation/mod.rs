//! Intersection admission control
//!
//! This module contains the concurrency core: a generic monitor queue and
//! the gate that lets vehicles into an intersection one at a time. The
//! demo world on top of it wires real threads together and can be run
//! from the console.

mod blocking_queue;
mod error;
mod intersection;
mod traffic_light;
mod types;
mod world;

pub use blocking_queue::{BlockingQueue, QueueOrder};
pub use error::GateError;
pub use intersection::{
    Admission, Coordinator, EntryTicket, GateConfig, IntersectionGate, DEFAULT_POLL_INTERVAL,
};
pub use traffic_light::{LightPhase, SignalLight, TrafficLight};
pub use types::{AdmissionToken, IntersectionId, SimId, VehicleId};
pub use world::{GateEvent, SimConfig, SimStats, SimWorld};
