//! Collaborator contracts
//!
//! The controller drives the robot exclusively through these traits. Each one
//! stands for a subsystem with its own hardware and algorithms (motor PID and
//! odometry, perimeter demodulation, IMU fusion, outline mapping, buzzer,
//! charger sensing); the controller only relies on the documented calls.

use crate::random::RandomSource;

/// Perimeter coil position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Side {
    Left,
    Right,
}

/// Acoustic feedback events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmKind {
    /// Startup, and a boundary loop closed successfully
    Ready,
    /// No reliable inside/outside reading for too long
    WireTimeout,
    /// Roll or pitch beyond the tilt limit
    Tilt,
}

/// Motor control, closed loop on heading and odometry
///
/// Every travel or rotate call replaces the motion in progress. Headings are
/// absolute, in radians. Speeds are fractions of full speed, the sign selects
/// direction.
pub trait Motion {
    /// Cuts drive power and cancels the motion in progress
    fn stop_immediately(&mut self);

    /// Drives `distance_cm` along `heading`
    fn travel_line_distance(&mut self, distance_cm: f32, heading: f32, speed: f32);

    /// Drives along `heading` for `duration_ms`
    fn travel_line_time(&mut self, duration_ms: u32, heading: f32, speed: f32);

    /// Turns on the spot until the robot faces `target`
    fn rotate_angle(&mut self, target: f32, speed: f32);

    /// Turns on the spot for `duration_ms`, positive speed turns counter-clockwise
    fn rotate_time(&mut self, duration_ms: u32, speed: f32);

    /// Freezes (`true`) or resumes (`false`) the motion in progress
    fn set_paused(&mut self, paused: bool);

    /// Raw power per side in [-1, 1], bypassing the motion controller
    fn set_power(&mut self, left: f32, right: f32);

    /// True once the last commanded motion has finished or was stopped
    fn is_stopped(&self) -> bool;
}

/// Perimeter wire signal
pub trait WireGuidance {
    /// Signed signal magnitude, negative inside the wire loop
    fn magnitude(&self, side: Side) -> f32;

    /// Filtered inside/outside decision for one coil
    fn is_inside(&self, side: Side) -> bool;

    /// True when no reliable inside reading arrived for the configured time
    fn signal_timed_out(&self) -> bool;

    /// Restarts the timeout window
    ///
    /// Takes effect immediately: `signal_timed_out` reports false right after.
    fn reset_timeout(&mut self);
}

/// Inertial orientation
pub trait Orientation {
    /// Advances sensor fusion, called at the orientation cadence
    fn update(&mut self);

    /// Yaw in radians, (−π, π]
    fn heading(&self) -> f32;

    /// `(roll, pitch)` in radians
    fn roll_pitch(&self) -> (f32, f32);

    /// True when the gyro bias needs to be re-estimated
    fn needs_calibration(&self) -> bool;

    /// True while a gyro calibration is running
    fn is_calibrating(&self) -> bool;

    /// Begins a gyro calibration, the robot must stand still until it completes
    fn start_calibration(&mut self);
}

/// Perimeter outline recording and localisation
pub trait BoundaryMapper {
    /// Advances localisation, called once per control tick
    fn update(&mut self) {}

    /// Drops any previously recorded outline
    fn clear_outline(&mut self);

    /// Spreads the localisation particles along the known outline
    fn distribute_particles_along_outline(&mut self);

    /// Smooths and closes the freshly recorded outline
    fn correct_outline(&mut self);

    /// Copies the outline into the persistent map
    fn commit_outline_to_map(&mut self);

    /// Persists the map
    fn save_map(&mut self);

    /// Estimated robot position in map units
    fn robot_position(&self) -> (f32, f32);

    /// Distance from `(x, y)` to the start point of the outline, in map units
    fn distance_to_map_origin(&self, x: f32, y: f32) -> f32;
}

/// Buzzer
pub trait Alarm {
    fn sound(&mut self, kind: AlarmKind);
}

/// Charging contacts
pub trait Charger {
    /// True while the robot sits on a powered charging station
    fn is_connected(&self) -> bool;
}

/// Bundle of all collaborators the controller drives
///
/// One accessor per service keeps borrows short: the controller reads the
/// heading, releases it, then commands the motors.
pub trait Platform {
    type Motion: Motion;
    type Wire: WireGuidance;
    type Orientation: Orientation;
    type Mapper: BoundaryMapper;
    type Alarm: Alarm;
    type Charger: Charger;
    type Random: RandomSource;

    fn motion(&mut self) -> &mut Self::Motion;
    fn wire(&mut self) -> &mut Self::Wire;
    fn orientation(&mut self) -> &mut Self::Orientation;
    fn mapper(&mut self) -> &mut Self::Mapper;
    fn alarm(&mut self) -> &mut Self::Alarm;
    fn charger(&mut self) -> &mut Self::Charger;
    fn random(&mut self) -> &mut Self::Random;
}
