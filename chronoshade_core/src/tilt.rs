//! Linear slat-tilt profile.

use crate::estimator::TravelProfile;
use crate::time_map::{TimeMap, ValidationError};
use chronoshade_traits::Direction;
use std::time::Duration;

/// Tilt travels linearly: `time_up` from 0 to 100, `time_down` from 100 to 0.
///
/// Each direction is kept as a one-segment `TimeMap` so the tilt axis runs
/// through exactly the same estimator and state machine as the position axis.
#[derive(Debug, Clone, PartialEq)]
pub struct TiltProfile {
    up: TimeMap,
    down: TimeMap,
}

impl TiltProfile {
    pub fn new(time_down_s: f64, time_up_s: f64) -> Result<Self, ValidationError> {
        Ok(Self {
            up: TimeMap::linear(Direction::Opening, tilt_duration(time_up_s)?)?,
            down: TimeMap::linear(Direction::Closing, tilt_duration(time_down_s)?)?,
        })
    }

    /// Tilt is disabled when neither time is set; a single time is used for
    /// both directions.
    pub fn from_optional(
        time_down_s: Option<f64>,
        time_up_s: Option<f64>,
    ) -> Result<Option<Self>, ValidationError> {
        match (time_down_s, time_up_s) {
            (None, None) => Ok(None),
            (Some(down), Some(up)) => Self::new(down, up).map(Some),
            (Some(t), None) | (None, Some(t)) => Self::new(t, t).map(Some),
        }
    }

    pub fn time_up(&self) -> Duration {
        self.up.total()
    }

    pub fn time_down(&self) -> Duration {
        self.down.total()
    }
}

impl TravelProfile for TiltProfile {
    fn map(&self, direction: Direction) -> &TimeMap {
        match direction {
            Direction::Opening => &self.up,
            Direction::Closing => &self.down,
        }
    }
}

fn tilt_duration(secs: f64) -> Result<Duration, ValidationError> {
    if !(secs.is_finite() && secs > 0.0) {
        return Err(ValidationError::InvalidTiltTime { secs });
    }
    Duration::try_from_secs_f64(secs).map_err(|_| ValidationError::InvalidTiltTime { secs })
}
