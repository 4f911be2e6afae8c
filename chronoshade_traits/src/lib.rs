//! Capabilities the cover engine depends on but does not implement.
//!
//! Hardware and storage backends live outside `chronoshade_core`; they plug
//! in through the traits below. Errors cross these boundaries as boxed trait
//! objects and are mapped to typed errors by the core.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Error type used at every capability boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Direction of travel of a cover axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards position 100.
    Opening,
    /// Towards position 0.
    Closing,
}

impl Direction {
    /// Direction needed to go from `from` to `to`; `None` when they are equal.
    pub fn between(from: u8, to: u8) -> Option<Self> {
        match to.cmp(&from) {
            std::cmp::Ordering::Greater => Some(Direction::Opening),
            std::cmp::Ordering::Less => Some(Direction::Closing),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Opening => "opening",
            Direction::Closing => "closing",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command a momentary (push-button style) actuator can be pulsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pulse {
    Open,
    Close,
    Stop,
}

/// Level-triggered actuator: the motor runs for as long as a direction is held.
pub trait LevelActuator {
    fn start(&mut self, direction: Direction) -> Result<(), BoxError>;
    fn stop(&mut self) -> Result<(), BoxError>;
}

/// Momentary actuator: a command is an activation that must be released
/// again; the device keeps moving on its own after the release.
pub trait MomentaryActuator {
    fn trigger(&mut self, pulse: Pulse) -> Result<(), BoxError>;
    fn release(&mut self) -> Result<(), BoxError>;
}

/// Uniform actuator seen by the movement controller.
///
/// Implemented by the `Level` and `Momentary` adapters in `chronoshade_core`.
pub trait DirectionalActuator {
    fn start(&mut self, direction: Direction) -> Result<(), BoxError>;
    fn stop(&mut self) -> Result<(), BoxError>;

    /// Release a momentary activation. Level actuators have nothing to release.
    fn release(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Whether every command must be followed by `release()`.
    fn needs_release(&self) -> bool {
        false
    }
}

impl<T: DirectionalActuator + ?Sized> DirectionalActuator for Box<T> {
    fn start(&mut self, direction: Direction) -> Result<(), BoxError> {
        (**self).start(direction)
    }
    fn stop(&mut self) -> Result<(), BoxError> {
        (**self).stop()
    }
    fn release(&mut self) -> Result<(), BoxError> {
        (**self).release()
    }
    fn needs_release(&self) -> bool {
        (**self).needs_release()
    }
}

/// Last known estimate of a cover, as written to durable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistedState {
    pub position: u8,
    pub tilt: Option<u8>,
}

/// Durable storage for cover estimates, keyed by stable cover identity.
pub trait PositionStore {
    fn load(&self, cover_id: &str) -> Result<Option<PersistedState>, BoxError>;
    fn save(&mut self, cover_id: &str, state: &PersistedState) -> Result<(), BoxError>;
}

impl<T: PositionStore + ?Sized> PositionStore for Box<T> {
    fn load(&self, cover_id: &str) -> Result<Option<PersistedState>, BoxError> {
        (**self).load(cover_id)
    }
    fn save(&mut self, cover_id: &str, state: &PersistedState) -> Result<(), BoxError> {
        (**self).save(cover_id, state)
    }
}
