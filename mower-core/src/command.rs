//! Operator commands
//!
//! Commands reach the controller from outside the control loop (RC buttons,
//! the serial protocol) and are applied between ticks by
//! [`Controller::apply`](crate::controller::Controller::apply). Arguments
//! arrive validated; the controller only wraps angles.

use crate::state::MowPattern;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Idle and stop immediately
    Stop,
    /// Raw motor power per side in [-1, 1]
    SetMotorPower { left: f32, right: f32 },
    /// Drive a distance along an absolute heading
    TravelDistance { distance_cm: f32, heading: f32, speed: f32 },
    /// Drive for a duration along an absolute heading
    TravelTime { duration_ms: u32, heading: f32, speed: f32 },
    /// Turn by `angle` relative to the current heading
    RotateBy { angle: f32, speed: f32 },
    /// Turn on the spot for a duration
    RotateTime { duration_ms: u32, speed: f32 },
    /// Re-estimate the gyro bias at the next control tick
    CalibrateGyro,
    /// Follow the wire forever in the given sense
    StartTracking { clockwise: bool },
    /// Trace the wire once and record the outline
    StartMapping,
    /// Trace the wire, then turn into position for the given pattern
    StartMappingThen(MowPattern),
    StartLaneMowing,
    StartRandomMowing,
    /// Spread the localisation particles along the recorded outline
    DistributeParticles,
    /// Replace the speed fractions
    SetSpeeds {
        reverse: f32,
        rotation: f32,
        track: f32,
        track_rotation: f32,
    },
    /// Change the side of the wire the robot works from
    SetTrackingSense { clockwise: bool },
    /// Hand the robot over to the operator
    RemoteControl,
    /// The robot left the charging station
    ChargerDisconnected,
}
