use crate::status::AxisKind;
use crate::time_map::ValidationError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoverError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ValidationError),
    #[error("actuator error: {0}")]
    Actuator(String),
    #[error("{axis} {value} is out of range (expected 0-100)")]
    OutOfRange { axis: AxisKind, value: u8 },
    #[error("tilt is not configured for this cover")]
    TiltUnsupported,
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("cover worker is not running")]
    Disconnected,
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
