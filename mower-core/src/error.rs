//! Configuration errors

use thiserror::Error;

/// Rejected controller configuration
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    #[error("speed fraction {name} = {value} is outside [0, 1]")]
    SpeedOutOfRange { name: &'static str, value: f32 },

    #[error("scheduler period {name} must be non-zero")]
    ZeroPeriod { name: &'static str },

    #[error("tilt limit {0} deg is outside (0, 90)")]
    TiltLimitOutOfRange(f32),

    #[error("maneuver parameter {name} = {value} must be positive")]
    NonPositiveManeuver { name: &'static str, value: f32 },
}
