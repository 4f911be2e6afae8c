//! Forward and inverse lookup on time maps.
//!
//! - `position_at`: elapsed travel time → position (0–100).
//! - `time_for_position`: position → elapsed travel time.
//!
//! Both clamp rather than extrapolate: once the final breakpoint is reached
//! the position stays pinned at the map's terminal value.
//!
//! Rounding: interpolated positions round to the nearest integer with ties
//! going toward the direction of travel (up for opening maps, down for
//! closing maps). A small tolerance treats values within `TIE_EPSILON` of a
//! half step as a tie so float noise does not flip the result.

use crate::time_map::{secs_to_duration, TimeMap, ValidationError};
use chronoshade_traits::Direction;
use std::time::Duration;

const TIE_EPSILON: f64 = 1e-9;

/// Source of the map to use for a given direction of travel.
pub trait TravelProfile {
    fn map(&self, direction: Direction) -> &TimeMap;
}

/// Opening + closing maps of a cover's main position axis.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionProfile {
    opening: TimeMap,
    closing: TimeMap,
}

impl PositionProfile {
    pub fn new(opening: TimeMap, closing: TimeMap) -> Result<Self, ValidationError> {
        for (map, expected) in [
            (&opening, Direction::Opening),
            (&closing, Direction::Closing),
        ] {
            if map.direction() != expected {
                return Err(ValidationError::DirectionMismatch {
                    expected,
                    found: map.direction(),
                });
            }
        }
        Ok(Self { opening, closing })
    }

    /// Linear profile with the same travel time in both directions.
    pub fn linear(total: Duration) -> Result<Self, ValidationError> {
        Self::new(
            TimeMap::linear(Direction::Opening, total)?,
            TimeMap::linear(Direction::Closing, total)?,
        )
    }
}

impl TravelProfile for PositionProfile {
    fn map(&self, direction: Direction) -> &TimeMap {
        match direction {
            Direction::Opening => &self.opening,
            Direction::Closing => &self.closing,
        }
    }
}

/// Position reached after `elapsed` of continuous travel along `map`.
pub fn position_at(map: &TimeMap, elapsed: Duration) -> u8 {
    let e = elapsed.as_secs_f64().clamp(0.0, map.total_secs());
    for w in map.breakpoints().windows(2) {
        let (a, b) = (w[0], w[1]);
        if e > b.elapsed_s {
            continue;
        }
        if e <= a.elapsed_s {
            return a.position;
        }
        let frac = (e - a.elapsed_s) / (b.elapsed_s - a.elapsed_s);
        let p0 = f64::from(a.position);
        let p1 = f64::from(b.position);
        return round_toward(p0 + (p1 - p0) * frac, map.direction());
    }
    map.end_position()
}

/// Earliest travel time at which `map` reaches `position`.
///
/// Positions the map never passes through clamp to the nearest end: time 0
/// when the position lies before the map's start, the final time when it
/// lies past its end.
pub fn time_for_position(map: &TimeMap, position: u8) -> Duration {
    let direction = map.direction();
    let reached = |p: u8| match direction {
        Direction::Opening => position <= p,
        Direction::Closing => position >= p,
    };

    let points = map.breakpoints();
    if reached(points[0].position) {
        return Duration::ZERO;
    }
    for w in points.windows(2) {
        let (a, b) = (w[0], w[1]);
        if !reached(b.position) {
            continue;
        }
        // `a` was not reached, so the segment is not flat and `a != b`.
        let p = f64::from(position);
        let p0 = f64::from(a.position);
        let p1 = f64::from(b.position);
        let frac = (p - p0) / (p1 - p0);
        return secs_to_duration(a.elapsed_s + (b.elapsed_s - a.elapsed_s) * frac);
    }
    map.total()
}

/// Round to the nearest integer, breaking ties toward `direction` of travel,
/// and clamp to 0..=100.
fn round_toward(p: f64, direction: Direction) -> u8 {
    let r = match direction {
        Direction::Opening => (p + 0.5 + TIE_EPSILON).floor(),
        Direction::Closing => (p - 0.5 - TIE_EPSILON).ceil(),
    };
    r.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opening(points: &[(f64, u8)]) -> TimeMap {
        TimeMap::validate(points.iter().copied(), Direction::Opening).unwrap()
    }

    fn closing(points: &[(f64, u8)]) -> TimeMap {
        TimeMap::validate(points.iter().copied(), Direction::Closing).unwrap()
    }

    #[test]
    fn ties_round_toward_travel_direction() {
        assert_eq!(round_toward(12.5, Direction::Opening), 13);
        assert_eq!(round_toward(12.5, Direction::Closing), 12);
        assert_eq!(round_toward(12.49, Direction::Opening), 12);
        assert_eq!(round_toward(12.51, Direction::Closing), 13);
    }

    #[test]
    fn rounding_clamps_to_valid_range() {
        assert_eq!(round_toward(100.4, Direction::Opening), 100);
        assert_eq!(round_toward(-0.7, Direction::Closing), 0);
    }

    #[test]
    fn half_step_on_linear_map() {
        // 0.05 s on a 10 s 0→100 map is exactly 0.5
        let m = opening(&[(0.0, 0), (10.0, 100)]);
        assert_eq!(position_at(&m, Duration::from_millis(50)), 1);
        let c = closing(&[(0.0, 100), (10.0, 0)]);
        assert_eq!(position_at(&c, Duration::from_millis(50)), 99);
    }

    #[test]
    fn flat_dead_time_resolves_to_earliest_time() {
        // Motor needs 2 s before the cover starts lifting, and sits at 100
        // for the last second.
        let m = opening(&[(0.0, 0), (2.0, 0), (9.0, 100), (10.0, 100)]);
        assert_eq!(time_for_position(&m, 0), Duration::ZERO);
        assert_eq!(time_for_position(&m, 100), Duration::from_secs(9));
        assert_eq!(position_at(&m, Duration::from_secs(1)), 0);
        assert_eq!(position_at(&m, Duration::from_millis(9500)), 100);
    }

    #[test]
    fn out_of_range_positions_clamp_to_ends() {
        let c = closing(&[(0.0, 100), (4.0, 0)]);
        assert_eq!(time_for_position(&c, 101), Duration::ZERO);
        let o = opening(&[(0.0, 0), (4.0, 100)]);
        assert_eq!(time_for_position(&o, 150), Duration::from_secs(4));
    }

    #[test]
    fn elapsed_past_end_pins_terminal_value() {
        let m = opening(&[(0.0, 0), (5.0, 40), (10.0, 100)]);
        assert_eq!(position_at(&m, Duration::from_secs(3600)), 100);
    }

    #[test]
    fn linear_profile_has_matching_directions() {
        let p = PositionProfile::linear(Duration::from_secs(12)).unwrap();
        assert_eq!(p.map(Direction::Opening).direction(), Direction::Opening);
        assert_eq!(p.map(Direction::Closing).total(), Duration::from_secs(12));
    }

    #[test]
    fn swapped_maps_are_rejected() {
        let o = opening(&[(0.0, 0), (1.0, 100)]);
        let err = PositionProfile::new(o.clone(), o).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DirectionMismatch {
                expected: Direction::Closing,
                found: Direction::Opening
            }
        );
    }
}
