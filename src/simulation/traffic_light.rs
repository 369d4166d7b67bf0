//! Traffic light collaborator
//!
//! The gate only ever asks one question of a light: is it green right now?
//! How and when the light changes is up to whoever owns it.

use std::sync::atomic::{AtomicBool, Ordering};

/// Anything that can tell the gate whether traffic may flow
///
/// `is_green` is called from the coordination thread while the gate lock is
/// held, so it must be cheap and must not block.
pub trait TrafficLight: Send + Sync {
    fn is_green(&self) -> bool;
}

/// Phase of a two-state signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightPhase {
    Red,
    Green,
}

impl LightPhase {
    pub fn opposite(self) -> Self {
        match self {
            LightPhase::Red => LightPhase::Green,
            LightPhase::Green => LightPhase::Red,
        }
    }
}

/// A light whose phase is set from outside
#[derive(Debug)]
pub struct SignalLight {
    green: AtomicBool,
}

impl SignalLight {
    pub fn new(phase: LightPhase) -> Self {
        Self {
            green: AtomicBool::new(phase == LightPhase::Green),
        }
    }

    pub fn phase(&self) -> LightPhase {
        if self.green.load(Ordering::Acquire) {
            LightPhase::Green
        } else {
            LightPhase::Red
        }
    }

    pub fn set_phase(&self, phase: LightPhase) {
        self.green.store(phase == LightPhase::Green, Ordering::Release);
    }

    /// Flip the light and return the new phase
    pub fn toggle(&self) -> LightPhase {
        let was_green = self.green.fetch_xor(true, Ordering::AcqRel);
        if was_green {
            LightPhase::Red
        } else {
            LightPhase::Green
        }
    }
}

impl Default for SignalLight {
    fn default() -> Self {
        Self::new(LightPhase::Red)
    }
}

impl TrafficLight for SignalLight {
    fn is_green(&self) -> bool {
        self.green.load(Ordering::Acquire)
    }
}
