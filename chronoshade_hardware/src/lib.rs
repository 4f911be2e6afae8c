//! Relay backends for cover actuators.
//!
//! A cover is driven by a pair of relays (open, close) and optionally a
//! third one (stop). The same relay set can be used two ways:
//!
//! - level: the motor runs while the open or close relay is held;
//! - momentary: each command is a short activation of one relay, released
//!   again by the caller.
//!
//! In both modes the opposite relay is always released before a relay is
//! energized, so open and close are never on together.
//!
//! `SimulatedRelay` is always available and is what the CLI runs against by
//! default. `GpioRelay` drives real pins through `rppal` and needs the
//! `hardware` feature on Linux.

pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

use chronoshade_traits::{BoxError, Direction, LevelActuator, MomentaryActuator, Pulse};
use error::HwError;
use std::sync::{Arc, Mutex};

/// Pin numbers (BCM) of a relay set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayPins {
    pub open: u8,
    pub close: u8,
    pub stop: Option<u8>,
}

/// One relay of a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relay {
    Open,
    Close,
    Stop,
}

impl Relay {
    pub fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::Opening => Relay::Open,
            Direction::Closing => Relay::Close,
        }
    }

    pub fn for_pulse(pulse: Pulse) -> Self {
        match pulse {
            Pulse::Open => Relay::Open,
            Pulse::Close => Relay::Close,
            Pulse::Stop => Relay::Stop,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Relay::Open => "open",
            Relay::Close => "close",
            Relay::Stop => "stop",
        }
    }
}

/// Relay transition recorded by `SimulatedRelay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEvent {
    On(Relay),
    Off(Relay),
}

#[derive(Debug, Default)]
struct SimState {
    energized: Vec<Relay>,
    events: Vec<RelayEvent>,
    fail: bool,
}

impl SimState {
    fn switch_on(&mut self, relay: Relay) {
        if self.energized.contains(&relay) {
            return;
        }
        self.energized.push(relay);
        self.events.push(RelayEvent::On(relay));
    }

    fn switch_off_all(&mut self) {
        for relay in self.energized.drain(..) {
            self.events.push(RelayEvent::Off(relay));
        }
    }

    /// Energize `relay` alone, releasing every other relay first.
    fn select(&mut self, relay: Relay) {
        let (keep, released): (Vec<Relay>, Vec<Relay>) =
            self.energized.iter().partition(|r| **r == relay);
        for r in released {
            self.events.push(RelayEvent::Off(r));
        }
        self.energized = keep;
        self.switch_on(relay);
    }
}

/// In-memory relay set. Clones share state, so a caller can keep a handle to
/// inspect the relay history after handing the relay to a controller.
#[derive(Debug, Clone)]
pub struct SimulatedRelay {
    name: String,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedRelay {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(SimState::default())),
        }
    }

    /// Make every following relay operation fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        if let Ok(mut s) = self.state.lock() {
            s.fail = fail;
        }
    }

    pub fn events(&self) -> Vec<RelayEvent> {
        self.state
            .lock()
            .map(|s| s.events.clone())
            .unwrap_or_default()
    }

    pub fn energized(&self) -> Vec<Relay> {
        self.state
            .lock()
            .map(|s| s.energized.clone())
            .unwrap_or_default()
    }

    fn with_state<F>(&self, op: &str, f: F) -> Result<(), BoxError>
    where
        F: FnOnce(&mut SimState),
    {
        let mut s = self
            .state
            .lock()
            .map_err(|_| HwError::Gpio(format!("{} relay state poisoned", self.name)))?;
        if s.fail {
            tracing::warn!(relay = %self.name, op, "injected relay fault");
            return Err(Box::new(HwError::Injected(self.name.clone())));
        }
        f(&mut *s);
        tracing::debug!(relay = %self.name, op, energized = ?s.energized, "relay switched");
        Ok(())
    }
}

impl LevelActuator for SimulatedRelay {
    fn start(&mut self, direction: Direction) -> Result<(), BoxError> {
        self.with_state(direction.as_str(), |s| {
            s.select(Relay::for_direction(direction));
        })
    }

    fn stop(&mut self) -> Result<(), BoxError> {
        self.with_state("stop", SimState::switch_off_all)
    }
}

impl MomentaryActuator for SimulatedRelay {
    fn trigger(&mut self, pulse: Pulse) -> Result<(), BoxError> {
        let relay = Relay::for_pulse(pulse);
        self.with_state(relay.as_str(), |s| s.select(relay))
    }

    fn release(&mut self) -> Result<(), BoxError> {
        self.with_state("release", SimState::switch_off_all)
    }
}
