//! Controller configuration
//!
//! Every tunable the state machines use, grouped by concern. `Default`
//! reproduces the values the mower ships with.

use crate::error::ConfigError;

/// Cadences of the three scheduled blocks
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SchedulerConfig {
    /// Orientation fusion update period (100 Hz)
    pub orientation_period_ms: u64,
    /// Control decision period (5 Hz)
    pub control_period_ms: u64,
    /// Telemetry period (1 Hz)
    pub telemetry_period_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            orientation_period_ms: 10,
            control_period_ms: 200,
            telemetry_period_ms: 1000,
        }
    }
}

/// Safety interlock limits
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SafetyConfig {
    /// Roll or pitch beyond this (degrees, strict) stops the robot
    pub tilt_limit_deg: f32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self { tilt_limit_deg: 30.0 }
    }
}

/// Speed fractions in [0, 1], direction is carried by the sign at the call site
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpeedConfig {
    /// Straight segments while following the wire
    pub track: f32,
    /// Rotation pulses while following the wire
    pub track_rotation: f32,
    /// Rotation between mowing lanes
    pub rotation: f32,
    /// Reverse after hitting the wire or an obstacle
    pub reverse: f32,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            track: 0.5,
            track_rotation: 0.3,
            rotation: 0.3,
            reverse: 0.3,
        }
    }
}

/// Distances (cm), durations (ms) and angles (rad) of the individual maneuvers
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ManeuverConfig {
    /// Straight run toward the wire when tracking or mapping starts
    pub find_wire_distance_cm: f32,
    /// First run of a lane mowing session
    pub first_lane_distance_cm: f32,
    /// Open-ended straight run, ended by the wire or an obstacle
    pub mow_line_distance_cm: f32,
    /// Reverse run after the wire was crossed
    pub reverse_distance_cm: f32,
    /// Short run that offsets the robot into the next lane
    pub enter_line_distance_cm: f32,
    /// Length of one straight or rotation pulse while following the wire
    pub track_pulse_ms: u32,
    /// A lane shorter than this counts as blocked and starts a new lane direction
    pub short_lane_ms: u64,
    /// Mapping closes once the robot is this close to the start point (map units)
    pub loop_closure_distance: f32,
    /// Skew of the lane entry run relative to the lane heading (rad)
    pub lane_entry_skew: f32,
    /// Turn after a closed map when a mow pattern follows (rad)
    pub post_map_turn: f32,
}

impl Default for ManeuverConfig {
    fn default() -> Self {
        Self {
            find_wire_distance_cm: 10_000.0,
            first_lane_distance_cm: 3_000.0,
            mow_line_distance_cm: 100_000.0,
            reverse_distance_cm: 50.0,
            enter_line_distance_cm: 15.0,
            track_pulse_ms: 300,
            short_lane_ms: 5_000,
            loop_closure_distance: 0.3,
            lane_entry_skew: core::f32::consts::FRAC_PI_4,
            post_map_turn: core::f32::consts::FRAC_PI_2,
        }
    }
}

/// Complete controller configuration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerConfig {
    pub scheduler: SchedulerConfig,
    pub safety: SafetyConfig,
    pub speed: SpeedConfig,
    pub maneuver: ManeuverConfig,
}

impl ControllerConfig {
    /// Checks every value the state machines rely on
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.speed.validate()?;

        let periods = [
            ("orientation_period_ms", self.scheduler.orientation_period_ms),
            ("control_period_ms", self.scheduler.control_period_ms),
            ("telemetry_period_ms", self.scheduler.telemetry_period_ms),
        ];
        for (name, period) in periods {
            if period == 0 {
                return Err(ConfigError::ZeroPeriod { name });
            }
        }

        let tilt = self.safety.tilt_limit_deg;
        if !(tilt > 0.0 && tilt < 90.0) {
            return Err(ConfigError::TiltLimitOutOfRange(tilt));
        }

        let maneuvers = [
            ("find_wire_distance_cm", self.maneuver.find_wire_distance_cm),
            ("first_lane_distance_cm", self.maneuver.first_lane_distance_cm),
            ("mow_line_distance_cm", self.maneuver.mow_line_distance_cm),
            ("reverse_distance_cm", self.maneuver.reverse_distance_cm),
            ("enter_line_distance_cm", self.maneuver.enter_line_distance_cm),
            ("loop_closure_distance", self.maneuver.loop_closure_distance),
        ];
        for (name, value) in maneuvers {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositiveManeuver { name, value });
            }
        }

        Ok(())
    }
}

impl SpeedConfig {
    /// Checks that every fraction lies in [0, 1]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fractions = [
            ("track", self.track),
            ("track_rotation", self.track_rotation),
            ("rotation", self.rotation),
            ("reverse", self.reverse),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::SpeedOutOfRange { name, value });
            }
        }
        Ok(())
    }
}
