//! Core identity types for the intersection gate
//!
//! These are plain copyable handles. The gate never owns a vehicle, it only
//! remembers who asked to enter.

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimId(pub usize);

/// A wrapper type for intersection IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntersectionId(pub SimId);

/// A wrapper type for vehicle IDs
///
/// Identities need not be unique: the same vehicle may hold several
/// independent places in a waiting line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub SimId);

/// Proof of admission minted by a gate when it lets a vehicle in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdmissionToken(pub u64);

impl std::fmt::Display for IntersectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "intersection#{}", self.0 .0)
    }
}

impl std::fmt::Display for VehicleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "vehicle#{}", self.0 .0)
    }
}
