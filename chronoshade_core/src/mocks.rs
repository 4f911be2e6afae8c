//! Test doubles for the capability traits.

use chronoshade_traits::{BoxError, Direction, DirectionalActuator, PersistedState, PositionStore};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Start(Direction),
    Stop,
    Release,
}

#[derive(Debug, Default)]
struct Shared {
    calls: Vec<ActuatorCall>,
    fail: bool,
}

/// Actuator that records every successful call. Clones share the record, so
/// a test keeps one handle after moving the other into a controller.
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    shared: Arc<Mutex<Shared>>,
    momentary: bool,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Behave like a momentary backend (`needs_release() == true`).
    pub fn momentary() -> Self {
        Self {
            momentary: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<ActuatorCall> {
        self.shared
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    /// Make every following call fail until reset with `false`.
    pub fn set_failing(&self, fail: bool) {
        if let Ok(mut s) = self.shared.lock() {
            s.fail = fail;
        }
    }

    fn record(&self, call: ActuatorCall) -> Result<(), BoxError> {
        let mut s = self
            .shared
            .lock()
            .map_err(|_| -> BoxError { "recording actuator poisoned".into() })?;
        if s.fail {
            return Err(Box::new(std::io::Error::other("relay unreachable")));
        }
        s.calls.push(call);
        Ok(())
    }
}

impl DirectionalActuator for RecordingActuator {
    fn start(&mut self, direction: Direction) -> Result<(), BoxError> {
        self.record(ActuatorCall::Start(direction))
    }
    fn stop(&mut self) -> Result<(), BoxError> {
        self.record(ActuatorCall::Stop)
    }
    fn release(&mut self) -> Result<(), BoxError> {
        self.record(ActuatorCall::Release)
    }
    fn needs_release(&self) -> bool {
        self.momentary
    }
}

/// Store whose disk is gone: every load and save fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrokenStore;

impl PositionStore for BrokenStore {
    fn load(&self, _cover_id: &str) -> Result<Option<PersistedState>, BoxError> {
        Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "state file unreadable",
        )))
    }

    fn save(&mut self, _cover_id: &str, _state: &PersistedState) -> Result<(), BoxError> {
        Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "state file unwritable",
        )))
    }
}
