#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Time-based cover position estimation (hardware-agnostic).
//!
//! Covers (blinds, shutters, awnings) report no position of their own. This
//! crate derives one purely from how long the motor has been running in each
//! direction, using per-direction time maps, and drives the motor through the
//! `chronoshade_traits` actuator capabilities.
//!
//! ## Architecture
//!
//! - **Time maps**: validated elapsed-time → position profiles (`time_map`)
//! - **Estimation**: forward/inverse lookup with directional rounding (`estimator`)
//! - **Tilt**: linear slat profile reusing the same machinery (`tilt`)
//! - **Control**: per-cover movement state machine (`controller`)
//! - **Serialization**: one worker thread per cover (`worker`)
//! - **Persistence**: last estimate per cover identity (`persist`)
//!
//! Positions are integers 0 (closed) to 100 (open).

pub mod actuator;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod estimator;
pub mod hw_error;
pub mod mocks;
pub mod persist;
pub mod status;
pub mod tilt;
pub mod time_map;
pub mod worker;

pub use actuator::{Level, Momentary};
pub use controller::{CoverSetup, MovementController, Tick, Timing};
pub use error::{CoverError, Report, Result};
pub use estimator::{PositionProfile, TravelProfile, position_at, time_for_position};
pub use persist::{JsonFileStore, MemoryStore};
pub use status::{AxisKind, CoverSnapshot, Motion};
pub use tilt::TiltProfile;
pub use time_map::{Breakpoint, TimeMap, ValidationError};
pub use worker::{Command, CoverHandle, CoverRemote};
