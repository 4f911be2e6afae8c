//! Validated time → position profiles.
//!
//! A `TimeMap` describes how far a cover has travelled after a given number
//! of seconds of continuous motion in one direction. Breakpoints are linearly
//! interpolated by the estimator; flat stretches model dead time at either
//! end of the travel.

use chronoshade_traits::Direction;
use std::time::Duration;
use thiserror::Error;

/// Longest travel a breakpoint may describe (one day).
pub const MAX_BREAKPOINT_SECS: f64 = 86_400.0;

/// One anchor point of a time map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub elapsed_s: f64,
    pub position: u8,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{direction} time map needs at least two breakpoints, got {count}")]
    TooFewPoints { direction: Direction, count: usize },
    #[error(
        "{direction} time map has invalid time {elapsed_s}s (must be within 0..={max}s)",
        max = MAX_BREAKPOINT_SECS
    )]
    InvalidTime { direction: Direction, elapsed_s: f64 },
    #[error("{direction} time map position {position} must be between 0 and 100")]
    PositionOutOfRange { direction: Direction, position: u8 },
    #[error("{direction} time map lists time {elapsed_s}s more than once")]
    DuplicateTime { direction: Direction, elapsed_s: f64 },
    #[error("{direction} time map must start at time 0, first breakpoint is at {first_s}s")]
    NotAnchoredAtZero { direction: Direction, first_s: f64 },
    #[error("{direction} time map must run from {expected_start} to {expected_end}, got {start} to {end}")]
    EndpointMismatch {
        direction: Direction,
        expected_start: u8,
        expected_end: u8,
        start: u8,
        end: u8,
    },
    #[error(
        "{direction} time map positions must be {rule}: {previous} is followed by {next} at {elapsed_s}s"
    )]
    NonMonotonic {
        direction: Direction,
        rule: &'static str,
        previous: u8,
        next: u8,
        elapsed_s: f64,
    },
    #[error("expected an {expected} time map, got a {found} one")]
    DirectionMismatch {
        expected: Direction,
        found: Direction,
    },
    #[error("tilt travel time {secs}s must be finite and > 0")]
    InvalidTiltTime { secs: f64 },
}

/// Immutable, validated profile for one direction of travel.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeMap {
    direction: Direction,
    points: Vec<Breakpoint>,
}

impl TimeMap {
    /// Validate `points` as a profile for `direction`.
    ///
    /// Points may arrive in any order (maps parsed from JSON objects are
    /// unordered); they are sorted by time before the ordering checks run.
    pub fn validate<I>(points: I, direction: Direction) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (f64, u8)>,
    {
        let mut points: Vec<Breakpoint> = points
            .into_iter()
            .map(|(elapsed_s, position)| Breakpoint {
                elapsed_s,
                position,
            })
            .collect();

        if points.len() < 2 {
            return Err(ValidationError::TooFewPoints {
                direction,
                count: points.len(),
            });
        }
        for bp in &points {
            if !(0.0..=MAX_BREAKPOINT_SECS).contains(&bp.elapsed_s) {
                return Err(ValidationError::InvalidTime {
                    direction,
                    elapsed_s: bp.elapsed_s,
                });
            }
            if bp.position > 100 {
                return Err(ValidationError::PositionOutOfRange {
                    direction,
                    position: bp.position,
                });
            }
        }

        points.sort_by(|a, b| a.elapsed_s.total_cmp(&b.elapsed_s));

        if let Some(w) = points
            .windows(2)
            .find(|w| w[0].elapsed_s == w[1].elapsed_s)
        {
            return Err(ValidationError::DuplicateTime {
                direction,
                elapsed_s: w[0].elapsed_s,
            });
        }

        let first = points[0];
        if first.elapsed_s != 0.0 {
            return Err(ValidationError::NotAnchoredAtZero {
                direction,
                first_s: first.elapsed_s,
            });
        }

        let (expected_start, expected_end) = endpoints(direction);
        let last = points[points.len() - 1];
        if first.position != expected_start || last.position != expected_end {
            return Err(ValidationError::EndpointMismatch {
                direction,
                expected_start,
                expected_end,
                start: first.position,
                end: last.position,
            });
        }

        for w in points.windows(2) {
            let (prev, next) = (w[0], w[1]);
            let ok = match direction {
                Direction::Opening => next.position >= prev.position,
                Direction::Closing => next.position <= prev.position,
            };
            if !ok {
                return Err(ValidationError::NonMonotonic {
                    direction,
                    rule: match direction {
                        Direction::Opening => "non-decreasing",
                        Direction::Closing => "non-increasing",
                    },
                    previous: prev.position,
                    next: next.position,
                    elapsed_s: next.elapsed_s,
                });
            }
        }

        Ok(Self { direction, points })
    }

    /// Two-point map covering the full travel in `total`.
    pub fn linear(direction: Direction, total: Duration) -> Result<Self, ValidationError> {
        let (start, end) = endpoints(direction);
        Self::validate([(0.0, start), (total.as_secs_f64(), end)], direction)
    }

    /// Spread `positions` evenly over `total_s` seconds.
    ///
    /// `[0, 100]` over 10 s yields `{0: 0, 10: 100}`; `[0, 30, 100]` puts 30
    /// at the 5 s mark.
    pub fn evenly_spaced(
        direction: Direction,
        total_s: f64,
        positions: &[u8],
    ) -> Result<Self, ValidationError> {
        if positions.len() < 2 {
            return Err(ValidationError::TooFewPoints {
                direction,
                count: positions.len(),
            });
        }
        let step = total_s / (positions.len() - 1) as f64;
        Self::validate(
            positions
                .iter()
                .enumerate()
                .map(|(i, &p)| (i as f64 * step, p)),
            direction,
        )
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.points
    }

    /// Time of the final breakpoint, in seconds.
    pub fn total_secs(&self) -> f64 {
        self.points[self.points.len() - 1].elapsed_s
    }

    /// Time of the final breakpoint.
    pub fn total(&self) -> Duration {
        secs_to_duration(self.total_secs())
    }

    pub fn start_position(&self) -> u8 {
        self.points[0].position
    }

    pub fn end_position(&self) -> u8 {
        self.points[self.points.len() - 1].position
    }
}

/// Required `(first, last)` positions for a map of the given direction.
pub fn endpoints(direction: Direction) -> (u8, u8) {
    match direction {
        Direction::Opening => (0, 100),
        Direction::Closing => (100, 0),
    }
}

/// Convert validated seconds to a `Duration`, saturating instead of panicking.
pub(crate) fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}
