//! Controller state
//!
//! [`ControllerState`] is written only by the controller, the safety monitor
//! and the two sub state machines. Everything else (telemetry, protocol, the
//! firmware glue) gets `&ControllerState` or a [`Telemetry`] copy.

use crate::config::SpeedConfig;

/// Overall robot mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RobotMode {
    Idle,
    CalibratingGyro,
    Tracking,
    CreatingMap,
    Mowing,
    RemoteControl,
    Charging,
}

/// Wire following phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrackState {
    /// Driving straight until a coil sees the wire
    Find,
    /// Following the wire in short straight and rotation pulses
    Run,
    /// Turning after a closed map, before handing over to mowing
    Rotate,
}

/// Coverage mowing phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MowState {
    /// Straight run until the wire or an obstacle
    Line,
    /// Backing off the wire
    Reverse,
    /// Turning toward the next heading
    Rotate,
    /// Short offset run into the next lane
    EnterLine,
}

/// Coverage pattern, fixed for the whole mow session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MowPattern {
    None,
    Lanes,
    Random,
}

/// Mode together with the sub state that is valid in it
///
/// Sub states only exist inside their governing mode, so switching modes
/// drops the old sub state by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Activity {
    Idle,
    CalibratingGyro,
    Tracking(TrackState),
    CreatingMap(TrackState),
    Mowing(MowState),
    RemoteControl,
    Charging,
}

impl Activity {
    pub fn mode(&self) -> RobotMode {
        match self {
            Activity::Idle => RobotMode::Idle,
            Activity::CalibratingGyro => RobotMode::CalibratingGyro,
            Activity::Tracking(_) => RobotMode::Tracking,
            Activity::CreatingMap(_) => RobotMode::CreatingMap,
            Activity::Mowing(_) => RobotMode::Mowing,
            Activity::RemoteControl => RobotMode::RemoteControl,
            Activity::Charging => RobotMode::Charging,
        }
    }

    pub fn track_state(&self) -> Option<TrackState> {
        match self {
            Activity::Tracking(state) | Activity::CreatingMap(state) => Some(*state),
            _ => None,
        }
    }

    pub fn mow_state(&self) -> Option<MowState> {
        match self {
            Activity::Mowing(state) => Some(*state),
            _ => None,
        }
    }
}

/// Sensors that fired since the last telemetry cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorTriggers(u16);

impl SensorTriggers {
    pub const NONE: Self = Self(0);
    pub const PERIMETER_LEFT: Self = Self(0x01);
    pub const PERIMETER_RIGHT: Self = Self(0x02);
    pub const TILT: Self = Self(0x04);
    pub const WIRE_TIMEOUT: Self = Self(0x08);
    pub const CHARGER: Self = Self(0x10);

    pub const fn bits(&self) -> u16 {
        self.0
    }

    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

/// Mutable record owned by the controller
#[derive(Debug, Clone)]
pub struct ControllerState {
    pub(crate) activity: Activity,
    pub(crate) previous: Activity,
    pub(crate) mow_pattern: MowPattern,
    pub(crate) track_clockwise: bool,
    pub(crate) mowing_angle: f32,
    pub(crate) mowing_direction: f32,
    pub(crate) track_angle: f32,
    pub(crate) rotate_angle: f32,
    pub(crate) speed: SpeedConfig,
    pub(crate) last_line_start_ms: u64,
    pub(crate) triggers: SensorTriggers,
    pub(crate) paused: bool,
    pub(crate) calibration_requested: bool,
    pub(crate) control_ticks: u16,
    pub(crate) ticks_per_second: u16,
}

impl ControllerState {
    /// Startup state: idle, clockwise wire tracking
    pub fn new(speed: SpeedConfig) -> Self {
        Self {
            activity: Activity::Idle,
            previous: Activity::Idle,
            mow_pattern: MowPattern::None,
            track_clockwise: true,
            mowing_angle: 0.0,
            mowing_direction: 0.0,
            track_angle: 0.0,
            rotate_angle: 0.0,
            speed,
            last_line_start_ms: 0,
            triggers: SensorTriggers::NONE,
            paused: false,
            calibration_requested: false,
            control_ticks: 0,
            ticks_per_second: 0,
        }
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn mode(&self) -> RobotMode {
        self.activity.mode()
    }

    /// Mode to resume once a gyro calibration completes
    pub fn previous_activity(&self) -> Activity {
        self.previous
    }

    pub fn track_state(&self) -> Option<TrackState> {
        self.activity.track_state()
    }

    pub fn mow_state(&self) -> Option<MowState> {
        self.activity.mow_state()
    }

    pub fn mow_pattern(&self) -> MowPattern {
        self.mow_pattern
    }

    pub fn track_clockwise(&self) -> bool {
        self.track_clockwise
    }

    pub fn mowing_angle(&self) -> f32 {
        self.mowing_angle
    }

    pub fn mowing_direction(&self) -> f32 {
        self.mowing_direction
    }

    pub fn track_angle(&self) -> f32 {
        self.track_angle
    }

    pub fn rotate_angle(&self) -> f32 {
        self.rotate_angle
    }

    pub fn speed(&self) -> SpeedConfig {
        self.speed
    }

    pub fn last_line_start_ms(&self) -> u64 {
        self.last_line_start_ms
    }

    pub fn sensor_triggers(&self) -> SensorTriggers {
        self.triggers
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Control ticks counted during the last complete telemetry window
    pub fn ticks_per_second(&self) -> u16 {
        self.ticks_per_second
    }

    /// Switches activity, logging mode and sub state changes
    pub(crate) fn set_activity(&mut self, next: Activity) {
        if next == self.activity {
            return;
        }
        if next.mode() != self.activity.mode() {
            info!("mode {:?} -> {:?}", self.activity.mode(), next.mode());
        } else {
            debug!("activity {:?} -> {:?}", self.activity, next);
        }
        self.activity = next;
    }

    /// Read-only copy for telemetry
    pub fn snapshot(&self, timestamp_ms: u64) -> Telemetry {
        Telemetry {
            timestamp_ms,
            mode: self.mode(),
            track_state: self.track_state(),
            mow_state: self.mow_state(),
            mow_pattern: self.mow_pattern,
            track_clockwise: self.track_clockwise,
            mowing_angle: self.mowing_angle,
            mowing_direction: self.mowing_direction,
            track_angle: self.track_angle,
            rotate_angle: self.rotate_angle,
            sensor_triggers: self.triggers,
            ticks_per_second: self.ticks_per_second,
        }
    }
}

/// Point-in-time copy of the controller state, handed to telemetry
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Telemetry {
    pub timestamp_ms: u64,
    pub mode: RobotMode,
    pub track_state: Option<TrackState>,
    pub mow_state: Option<MowState>,
    pub mow_pattern: MowPattern,
    pub track_clockwise: bool,
    pub mowing_angle: f32,
    pub mowing_direction: f32,
    pub track_angle: f32,
    pub rotate_angle: f32,
    pub sensor_triggers: SensorTriggers,
    pub ticks_per_second: u16,
}

/// Receiver of the 1 Hz telemetry snapshot
pub trait TelemetrySink {
    fn emit(&mut self, telemetry: &Telemetry);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_with_no_sub_state() {
        let state = ControllerState::new(SpeedConfig::default());
        assert_eq!(state.mode(), RobotMode::Idle);
        assert_eq!(state.track_state(), None);
        assert_eq!(state.mow_state(), None);
        assert!(state.sensor_triggers().is_empty());
    }

    #[test]
    fn activity_projects_sub_states() {
        let mapping = Activity::CreatingMap(TrackState::Run);
        assert_eq!(mapping.mode(), RobotMode::CreatingMap);
        assert_eq!(mapping.track_state(), Some(TrackState::Run));
        assert_eq!(mapping.mow_state(), None);

        let mowing = Activity::Mowing(MowState::EnterLine);
        assert_eq!(mowing.mode(), RobotMode::Mowing);
        assert_eq!(mowing.track_state(), None);
        assert_eq!(mowing.mow_state(), Some(MowState::EnterLine));
    }

    #[test]
    fn sensor_triggers_accumulate_and_clear() {
        let mut triggers = SensorTriggers::NONE;
        triggers.insert(SensorTriggers::PERIMETER_LEFT);
        triggers.insert(SensorTriggers::TILT);
        assert!(triggers.contains(SensorTriggers::PERIMETER_LEFT));
        assert!(triggers.contains(SensorTriggers::TILT));
        assert!(!triggers.contains(SensorTriggers::PERIMETER_RIGHT));
        assert_eq!(triggers.bits(), 0x05);
        triggers.clear();
        assert!(triggers.is_empty());
    }

    #[test]
    fn snapshot_copies_fields() {
        let mut state = ControllerState::new(SpeedConfig::default());
        state.activity = Activity::Mowing(MowState::Reverse);
        state.mow_pattern = MowPattern::Lanes;
        state.mowing_angle = 1.0;
        state.triggers.insert(SensorTriggers::PERIMETER_RIGHT);
        state.ticks_per_second = 5;

        let snapshot = state.snapshot(1234);
        assert_eq!(snapshot.timestamp_ms, 1234);
        assert_eq!(snapshot.mode, RobotMode::Mowing);
        assert_eq!(snapshot.mow_state, Some(MowState::Reverse));
        assert_eq!(snapshot.mow_pattern, MowPattern::Lanes);
        assert_eq!(snapshot.mowing_angle, 1.0);
        assert!(snapshot.sensor_triggers.contains(SensorTriggers::PERIMETER_RIGHT));
        assert_eq!(snapshot.ticks_per_second, 5);
    }
}
