//! Observable cover state.

use chronoshade_traits::Direction;
use serde::Serialize;

/// Which of the two independently timed axes a command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    Position,
    Tilt,
}

impl AxisKind {
    pub fn other(self) -> Self {
        match self {
            AxisKind::Position => AxisKind::Tilt,
            AxisKind::Tilt => AxisKind::Position,
        }
    }
}

impl std::fmt::Display for AxisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AxisKind::Position => "position",
            AxisKind::Tilt => "tilt",
        })
    }
}

/// Motion state of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Motion {
    #[default]
    Idle,
    Opening,
    Closing,
}

impl From<Direction> for Motion {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Opening => Motion::Opening,
            Direction::Closing => Motion::Closing,
        }
    }
}

/// Point-in-time view of a cover. Positions are live estimates while moving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverSnapshot {
    pub cover: String,
    pub position: u8,
    pub tilt: Option<u8>,
    pub motion: Motion,
    pub tilt_motion: Motion,
    pub target_position: Option<u8>,
    pub target_tilt: Option<u8>,
}

impl CoverSnapshot {
    pub fn is_moving(&self) -> bool {
        self.motion != Motion::Idle || self.tilt_motion != Motion::Idle
    }
}
