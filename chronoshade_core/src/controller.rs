//! Movement state machine for one cover.
//!
//! The controller never reads a clock: every transition takes the current
//! instant explicitly and returns the next instant it needs to be polled at
//! (`Tick::next`). The worker in `crate::worker` drives it with real time;
//! tests drive it with hand-picked instants.
//!
//! Two axes share the cover's single actuator:
//! - the position axis, timed by a `PositionProfile`;
//! - the optional tilt axis, timed by a `TiltProfile`.
//!
//! Only one axis travels at a time. Starting one while the other is moving
//! snapshots the other at its elapsed-time estimate and hands the motor over.
//!
//! A pending stop deadline lives inside the axis' `Travel`. Any command that
//! replaces or clears the travel therefore cancels the old deadline before the
//! new state exists; there is no separate timer that could fire late.

use crate::error::{CoverError, Result};
use crate::estimator::{PositionProfile, TravelProfile, position_at, time_for_position};
use crate::hw_error::{map_actuator_error, map_store_error};
use crate::status::{AxisKind, CoverSnapshot, Motion};
use crate::tilt::TiltProfile;
use chronoshade_traits::{BoxError, Direction, DirectionalActuator, PersistedState, PositionStore};
use std::time::{Duration, Instant};

/// Interval of live re-estimation while moving.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);
/// How long a momentary actuator is held before it is released.
pub const DEFAULT_RELEASE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Re-estimation interval while moving. Never moves a stop deadline.
    pub tick: Duration,
    /// Delay between a momentary command and its release.
    pub release_delay: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            release_delay: DEFAULT_RELEASE_DELAY,
        }
    }
}

/// Everything needed to bring up one cover.
#[derive(Debug, Clone)]
pub struct CoverSetup {
    pub id: String,
    pub name: String,
    pub profile: PositionProfile,
    pub tilt: Option<TiltProfile>,
    pub timing: Timing,
}

impl CoverSetup {
    pub fn new(id: impl Into<String>, profile: PositionProfile) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            profile,
            tilt: None,
            timing: Timing::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_tilt(mut self, tilt: TiltProfile) -> Self {
        self.tilt = Some(tilt);
        self
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }
}

/// Result of a `poll`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    /// When to poll again; `None` while idle with nothing pending.
    pub next: Option<Instant>,
    /// Axis whose stop deadline fired during this poll.
    pub stopped: Option<AxisKind>,
    /// Failure of a timer-driven actuator or store call. Nobody is waiting
    /// on these synchronously, so they are handed to the driver to report.
    pub failure: Option<CoverError>,
}

/// One leg of motion in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Travel {
    direction: Direction,
    started_at: Instant,
    /// Map time at which the map passes the starting position.
    start_offset: Duration,
    target: u8,
    stop_at: Instant,
}

impl Travel {
    fn plan(profile: &dyn TravelProfile, from: u8, target: u8, now: Instant) -> Option<Self> {
        let direction = Direction::between(from, target)?;
        let map = profile.map(direction);
        let t_from = time_for_position(map, from);
        let t_target = time_for_position(map, target);
        Some(Self {
            direction,
            started_at: now,
            start_offset: t_from,
            target,
            stop_at: now + t_target.abs_diff(t_from),
        })
    }

    /// Elapsed-time estimate, never reported past the target.
    fn estimate(&self, profile: &dyn TravelProfile, now: Instant) -> u8 {
        let elapsed = now.saturating_duration_since(self.started_at);
        let p = position_at(profile.map(self.direction), self.start_offset + elapsed);
        match self.direction {
            Direction::Opening => p.min(self.target),
            Direction::Closing => p.max(self.target),
        }
    }
}

struct Axis {
    kind: AxisKind,
    profile: Box<dyn TravelProfile + Send>,
    current: u8,
    travel: Option<Travel>,
}

impl Axis {
    fn new(kind: AxisKind, profile: Box<dyn TravelProfile + Send>, current: u8) -> Self {
        Self {
            kind,
            profile,
            current,
            travel: None,
        }
    }

    fn estimate(&self, now: Instant) -> u8 {
        match &self.travel {
            Some(t) => t.estimate(self.profile.as_ref(), now),
            None => self.current,
        }
    }

    fn motion(&self) -> Motion {
        self.travel.map_or(Motion::Idle, |t| t.direction.into())
    }

    /// Freeze the axis at its elapsed-time estimate and drop its deadline.
    fn settle(&mut self, now: Instant) -> u8 {
        self.current = self.estimate(now);
        self.travel = None;
        self.current
    }
}

pub struct MovementController<A, S> {
    id: String,
    name: String,
    actuator: A,
    store: S,
    position: Axis,
    tilt: Option<Axis>,
    timing: Timing,
    release_at: Option<Instant>,
}

impl<A, S> core::fmt::Debug for MovementController<A, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MovementController")
            .field("id", &self.id)
            .field("position", &self.position.current)
            .field("position_travel", &self.position.travel)
            .field("tilt", &self.tilt.as_ref().map(|t| t.current))
            .field("tilt_travel", &self.tilt.as_ref().and_then(|t| t.travel))
            .field("release_at", &self.release_at)
            .finish()
    }
}

impl<A, S> MovementController<A, S>
where
    A: DirectionalActuator,
    S: PositionStore,
{
    /// Bring a cover up, seeded from `store` (fully closed when nothing was
    /// persisted or the store cannot be read).
    pub fn new(setup: CoverSetup, actuator: A, store: S) -> Self {
        let restored = match store.load(&setup.id) {
            Ok(state) => state,
            Err(e) => {
                let err = map_store_error(&*e);
                tracing::warn!(cover = %setup.id, error = %err, "could not load persisted state; assuming closed");
                None
            }
        };
        let position = restored.map_or(0, |s| restored_value(&setup.id, AxisKind::Position, s.position));
        let tilt_value = restored
            .and_then(|s| s.tilt)
            .map_or(0, |t| restored_value(&setup.id, AxisKind::Tilt, t));

        let tilt = setup
            .tilt
            .map(|p| Axis::new(AxisKind::Tilt, Box::new(p), tilt_value));
        tracing::info!(
            cover = %setup.id,
            position,
            tilt = tilt.as_ref().map(|t| t.current),
            restored = restored.is_some(),
            "cover ready"
        );

        Self {
            position: Axis::new(AxisKind::Position, Box::new(setup.profile), position),
            tilt,
            id: setup.id,
            name: setup.name,
            actuator,
            store,
            timing: setup.timing,
            release_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn has_tilt(&self) -> bool {
        self.tilt.is_some()
    }

    pub fn is_moving(&self) -> bool {
        self.axes().any(|a| a.travel.is_some())
    }

    pub fn current_position(&self, now: Instant) -> u8 {
        self.position.estimate(now)
    }

    pub fn current_tilt(&self, now: Instant) -> Option<u8> {
        self.tilt.as_ref().map(|t| t.estimate(now))
    }

    pub fn snapshot(&self, now: Instant) -> CoverSnapshot {
        CoverSnapshot {
            cover: self.id.clone(),
            position: self.position.estimate(now),
            tilt: self.current_tilt(now),
            motion: self.position.motion(),
            tilt_motion: self.tilt.as_ref().map_or(Motion::Idle, Axis::motion),
            target_position: self.position.travel.map(|t| t.target),
            target_tilt: self.tilt.as_ref().and_then(|t| t.travel).map(|t| t.target),
        }
    }

    pub fn open(&mut self, now: Instant) -> Result<()> {
        self.request(AxisKind::Position, 100, now)
    }

    pub fn close(&mut self, now: Instant) -> Result<()> {
        self.request(AxisKind::Position, 0, now)
    }

    pub fn request_position(&mut self, target: u8, now: Instant) -> Result<()> {
        self.request(AxisKind::Position, target, now)
    }

    pub fn open_tilt(&mut self, now: Instant) -> Result<()> {
        self.request(AxisKind::Tilt, 100, now)
    }

    pub fn close_tilt(&mut self, now: Instant) -> Result<()> {
        self.request(AxisKind::Tilt, 0, now)
    }

    pub fn request_tilt(&mut self, target: u8, now: Instant) -> Result<()> {
        self.request(AxisKind::Tilt, target, now)
    }

    /// Stop all motion at the elapsed-time estimate and persist it.
    ///
    /// The actuator is told to stop even when the cover is believed idle: the
    /// estimate may be wrong after an earlier actuator failure, and an
    /// explicit stop must always reach the motor.
    pub fn stop(&mut self, now: Instant) -> Result<()> {
        let was_moving = self.is_moving();
        self.command(now, |a| a.stop())?;
        for axis in self.axes_mut() {
            axis.settle(now);
        }
        if was_moving {
            tracing::info!(
                cover = %self.id,
                position = self.position.current,
                tilt = self.tilt.as_ref().map(|t| t.current),
                "motion stopped"
            );
        } else {
            tracing::debug!(cover = %self.id, "stop requested while idle");
        }
        self.persist()?;
        Ok(())
    }

    /// Stop the tilt axis only; a no-op unless tilt is the axis travelling.
    pub fn stop_tilt(&mut self, now: Instant) -> Result<()> {
        if self.axis(AxisKind::Tilt)?.travel.is_none() {
            tracing::debug!(cover = %self.id, "tilt stop requested while tilt idle");
            return Ok(());
        }
        self.command(now, |a| a.stop())?;
        let tilt = self.axis_mut(AxisKind::Tilt)?.settle(now);
        tracing::info!(cover = %self.id, tilt, "tilt stopped");
        self.persist()?;
        Ok(())
    }

    /// Calibrate the position estimate without moving the cover.
    pub fn set_known_position(&mut self, position: u8, now: Instant) -> Result<()> {
        self.set_known(AxisKind::Position, position, now)
    }

    /// Calibrate the tilt estimate without moving the slats.
    pub fn set_known_tilt(&mut self, tilt: u8, now: Instant) -> Result<()> {
        self.set_known(AxisKind::Tilt, tilt, now)
    }

    /// Fire whatever is due at `now`: a momentary release and/or a stop
    /// deadline.
    pub fn poll(&mut self, now: Instant) -> Tick {
        let mut failure = None;

        if self.release_at.is_some_and(|at| at <= now) {
            match self.actuator.release() {
                Ok(()) => {
                    self.release_at = None;
                    tracing::trace!(cover = %self.id, "actuator released");
                }
                Err(e) => {
                    let err = map_actuator_error(&*e);
                    tracing::error!(cover = %self.id, error = %err, "release failed; retrying");
                    self.release_at = Some(now + self.timing.tick);
                    failure = Some(err);
                }
            }
        }

        let mut stopped = None;
        if let Some(kind) = self.due_axis(now) {
            match self.finish(kind, now) {
                Ok(()) => stopped = Some(kind),
                Err(err) => failure = Some(err),
            }
        } else if let Some(axis) = self.axes().find(|a| a.travel.is_some()) {
            tracing::trace!(cover = %self.id, axis = %axis.kind, estimate = axis.estimate(now), "tick");
        }

        Tick {
            next: self.next_wakeup(now),
            stopped,
            failure,
        }
    }

    /// Bring the actuator to rest before the controller goes away: stop any
    /// motion and release a held momentary command immediately.
    pub fn shutdown(&mut self, now: Instant) -> Result<()> {
        if self.is_moving() {
            self.stop(now)?;
        }
        if self.release_at.is_some() {
            self.actuator
                .release()
                .map_err(|e| actuator_failure(&self.id, e))?;
            self.release_at = None;
        }
        Ok(())
    }

    /// Earliest instant at which `poll` has work to do.
    pub fn next_wakeup(&self, now: Instant) -> Option<Instant> {
        let travel = self
            .axes()
            .find_map(|a| a.travel)
            .map(|t| t.stop_at.min(now + self.timing.tick));
        match (self.release_at, travel) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn request(&mut self, kind: AxisKind, target: u8, now: Instant) -> Result<()> {
        check_range(kind, target)?;
        let axis = self.axis(kind)?;
        let from = axis.estimate(now);
        let was_moving = axis.travel.is_some();

        let Some(travel) = Travel::plan(axis.profile.as_ref(), from, target, now) else {
            if was_moving {
                // Retargeted onto the live estimate: that is a stop.
                return self.stop(now);
            }
            tracing::debug!(cover = %self.id, axis = %kind, target, "already at target");
            return Ok(());
        };

        // Same direction keeps the motor running; re-triggering a momentary
        // actuator could be read as a stop by the device.
        if self.running_direction() != Some(travel.direction) {
            self.command(now, |a| a.start(travel.direction))?;
        }

        if let Some(other) = self.axis_opt_mut(kind.other())
            && other.travel.is_some()
        {
            let at = other.settle(now);
            tracing::debug!(cover = %self.id, axis = %kind.other(), at, "superseded by new motion");
        }
        let axis = self.axis_mut(kind)?;
        axis.current = from;
        axis.travel = Some(travel);

        tracing::info!(
            cover = %self.id,
            axis = %kind,
            from,
            target,
            direction = %travel.direction,
            travel_ms = travel.stop_at.saturating_duration_since(now).as_millis() as u64,
            "motion started"
        );
        Ok(())
    }

    fn set_known(&mut self, kind: AxisKind, value: u8, now: Instant) -> Result<()> {
        check_range(kind, value)?;
        self.axis(kind)?;
        if self.is_moving() {
            self.command(now, |a| a.stop())?;
            for axis in self.axes_mut() {
                axis.settle(now);
            }
        }
        let axis = self.axis_mut(kind)?;
        let previous = axis.current;
        axis.current = value;
        tracing::info!(cover = %self.id, axis = %kind, previous, value, "calibrated");
        self.persist()?;
        Ok(())
    }

    /// Deadline reached: stop exactly at the target.
    fn finish(&mut self, kind: AxisKind, now: Instant) -> std::result::Result<(), CoverError> {
        if let Err(err) = self.command(now, |a| a.stop()) {
            // The motor may still be running; try again on the next tick.
            let retry = now + self.timing.tick;
            if let Some(t) = self.axis_opt_mut(kind).and_then(|a| a.travel.as_mut()) {
                t.stop_at = retry;
            }
            return Err(err);
        }
        if let Some(axis) = self.axis_opt_mut(kind) {
            if let Some(t) = axis.travel.take() {
                axis.current = t.target;
            }
            let at = axis.current;
            tracing::info!(cover = %self.id, axis = %kind, at, "target reached");
        }
        self.persist()
    }

    fn due_axis(&self, now: Instant) -> Option<AxisKind> {
        self.axes()
            .find(|a| a.travel.is_some_and(|t| t.stop_at <= now))
            .map(|a| a.kind)
    }

    fn running_direction(&self) -> Option<Direction> {
        self.axes().find_map(|a| a.travel).map(|t| t.direction)
    }

    /// Issue one actuator command, releasing any held momentary command first.
    ///
    /// On failure nothing is changed and the error is returned.
    fn command<F>(&mut self, now: Instant, op: F) -> std::result::Result<(), CoverError>
    where
        F: FnOnce(&mut A) -> std::result::Result<(), BoxError>,
    {
        if self.release_at.is_some() {
            self.actuator
                .release()
                .map_err(|e| actuator_failure(&self.id, e))?;
            self.release_at = None;
        }
        op(&mut self.actuator).map_err(|e| actuator_failure(&self.id, e))?;
        if self.actuator.needs_release() {
            self.release_at = Some(now + self.timing.release_delay);
        }
        Ok(())
    }

    fn persist(&mut self) -> std::result::Result<(), CoverError> {
        let state = PersistedState {
            position: self.position.current,
            tilt: self.tilt.as_ref().map(|t| t.current),
        };
        self.store.save(&self.id, &state).map_err(|e| {
            let err = map_store_error(&*e);
            tracing::warn!(cover = %self.id, error = %err, "could not persist estimate");
            err
        })?;
        tracing::debug!(cover = %self.id, position = state.position, tilt = state.tilt, "estimate persisted");
        Ok(())
    }

    fn axis(&self, kind: AxisKind) -> std::result::Result<&Axis, CoverError> {
        match kind {
            AxisKind::Position => Ok(&self.position),
            AxisKind::Tilt => self.tilt.as_ref().ok_or(CoverError::TiltUnsupported),
        }
    }

    fn axis_mut(&mut self, kind: AxisKind) -> std::result::Result<&mut Axis, CoverError> {
        self.axis_opt_mut(kind).ok_or(CoverError::TiltUnsupported)
    }

    fn axis_opt_mut(&mut self, kind: AxisKind) -> Option<&mut Axis> {
        match kind {
            AxisKind::Position => Some(&mut self.position),
            AxisKind::Tilt => self.tilt.as_mut(),
        }
    }

    fn axes(&self) -> impl Iterator<Item = &Axis> {
        std::iter::once(&self.position).chain(self.tilt.as_ref())
    }

    fn axes_mut(&mut self) -> impl Iterator<Item = &mut Axis> {
        std::iter::once(&mut self.position).chain(self.tilt.as_mut())
    }
}

fn check_range(axis: AxisKind, value: u8) -> std::result::Result<(), CoverError> {
    if value > 100 {
        return Err(CoverError::OutOfRange { axis, value });
    }
    Ok(())
}

fn actuator_failure(cover: &str, e: BoxError) -> CoverError {
    let err = map_actuator_error(&*e);
    tracing::error!(cover, error = %err, "actuator command failed");
    err
}

/// Persisted values outside 0..=100 come from a hand-edited or foreign
/// state file; pin them to the valid range.
fn restored_value(cover: &str, axis: AxisKind, value: u8) -> u8 {
    if value > 100 {
        tracing::warn!(cover, %axis, value, "persisted value out of range; clamping to 100");
        return 100;
    }
    value
}
