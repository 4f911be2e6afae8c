//! Bridges from `chronoshade_config` types to core types.
//!
//! Config parsing only checks what can be checked without knowing the
//! direction of travel; the structural time-map checks run here, and a cover
//! whose maps fail them is never built.

use crate::controller::{CoverSetup, Timing};
use crate::error::{CoverError, Result};
use crate::estimator::{PositionProfile, TravelProfile};
use crate::tilt::TiltProfile;
use crate::time_map::{TimeMap, ValidationError};
use chronoshade_config::{ControllerCfg, CoverCfg, MapSpec};
use chronoshade_traits::Direction;
use eyre::WrapErr;
use std::time::Duration;

impl From<&ControllerCfg> for Timing {
    fn from(c: &ControllerCfg) -> Self {
        Self {
            tick: Duration::from_millis(c.tick_ms),
            release_delay: Duration::from_millis(c.release_ms),
        }
    }
}

pub fn time_map(input: &MapSpec, direction: Direction) -> std::result::Result<TimeMap, ValidationError> {
    match input {
        MapSpec::Breakpoints(points) => TimeMap::validate(points.iter().copied(), direction),
        MapSpec::Evenly { total_s, positions } => {
            TimeMap::evenly_spaced(direction, *total_s, positions)
        }
    }
}

/// Build the setup of cover `id` (already normalized) from its config table.
pub fn cover_setup(id: &str, cfg: &CoverCfg, controller: &ControllerCfg) -> Result<CoverSetup> {
    let opening = cfg
        .opening_map()
        .wrap_err_with(|| format!("cover {id}"))?;
    let closing = cfg
        .closing_map()
        .wrap_err_with(|| format!("cover {id}"))?;

    let profile = PositionProfile::new(
        time_map(&opening, Direction::Opening).map_err(CoverError::from)?,
        time_map(&closing, Direction::Closing).map_err(CoverError::from)?,
    )
    .map_err(CoverError::from)?;
    let tilt = TiltProfile::from_optional(cfg.tilting_time_down, cfg.tilting_time_up)
        .map_err(CoverError::from)?;

    let mut setup = CoverSetup::new(id, profile)
        .with_name(cfg.name.as_deref().unwrap_or(id))
        .with_timing(controller.into());
    if let Some(t) = tilt {
        setup = setup.with_tilt(t);
    }
    tracing::debug!(
        cover = %id,
        opening_s = setup.profile.map(Direction::Opening).total_secs(),
        closing_s = setup.profile.map(Direction::Closing).total_secs(),
        tilt = setup.tilt.is_some(),
        "cover configured"
    );
    Ok(setup)
}
