//! Errors surfaced by the intersection gate

use thiserror::Error;

use super::types::{IntersectionId, VehicleId};

#[derive(Debug, Error)]
pub enum GateError {
    /// The gate was closed (or dropped) before the request could be served
    #[error("{gate} is closed")]
    Closed { gate: IntersectionId },

    /// The waiting line reached its configured capacity
    #[error("waiting line at {gate} is full ({capacity} vehicles)")]
    LineFull {
        gate: IntersectionId,
        capacity: usize,
    },

    /// A departure was reported with an admission this gate does not hold
    #[error("{vehicle} is not the vehicle currently admitted to {gate}")]
    NotAdmitted {
        gate: IntersectionId,
        vehicle: VehicleId,
    },

    #[error("{gate} already has a coordination thread")]
    AlreadyRunning { gate: IntersectionId },

    #[error("{vehicle} was not admitted to {gate} in time")]
    Timeout {
        gate: IntersectionId,
        vehicle: VehicleId,
    },

    #[error("failed to spawn coordination thread: {0}")]
    Spawn(#[from] std::io::Error),
}
