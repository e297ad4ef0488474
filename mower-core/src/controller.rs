//! Top-level robot state machine
//!
//! [`Controller`] owns the [`ControllerState`], the injected [`Platform`] and
//! the configuration. It exposes the entry operations, applies operator
//! commands between ticks and runs the per-tick decision: interlocks first,
//! then dispatch to the sub state machine of the active mode.

use crate::angle;
use crate::command::Command;
use crate::config::ControllerConfig;
use crate::error::ConfigError;
use crate::service::{BoundaryMapper, Motion, Orientation, Platform};
use crate::state::{Activity, ControllerState, MowPattern, MowState, Telemetry, TrackState};
use crate::{mowing, safety, tracking};

const FULL_SPEED: f32 = 1.0;

pub struct Controller<P: Platform> {
    state: ControllerState,
    platform: P,
    config: ControllerConfig,
}

impl<P: Platform> Controller<P> {
    /// Validates `config` and builds an idle controller around `platform`
    pub fn new(config: ControllerConfig, platform: P) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: ControllerState::new(config.speed),
            platform,
            config,
        })
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Idle and stop, from any state
    pub fn set_idle(&mut self) {
        safety::go_idle(&mut self.state, &mut self.platform);
    }

    /// Traces the wire once, recording a fresh outline
    ///
    /// The current mow pattern is kept as the follow-up pattern, see
    /// [`start_mapping_then`](Self::start_mapping_then).
    pub fn start_mapping(&mut self) {
        self.platform.mapper().clear_outline();
        self.state.set_activity(Activity::CreatingMap(TrackState::Find));
        self.find_wire();
    }

    /// Traces the wire, then turns into position for `pattern`
    pub fn start_mapping_then(&mut self, pattern: MowPattern) {
        self.state.mow_pattern = pattern;
        self.start_mapping();
    }

    pub fn start_tracking_forever(&mut self) {
        self.state.mow_pattern = MowPattern::None;
        self.state.set_activity(Activity::Tracking(TrackState::Find));
        self.find_wire();
    }

    pub fn start_lane_mowing(&mut self) {
        self.start_mowing(MowPattern::Lanes, self.config.maneuver.first_lane_distance_cm);
    }

    pub fn start_random_mowing(&mut self) {
        self.start_mowing(MowPattern::Random, self.config.maneuver.mow_line_distance_cm);
    }

    fn find_wire(&mut self) {
        let heading = self.platform.orientation().heading();
        let speed = self.state.speed.track;
        self.platform
            .motion()
            .travel_line_distance(self.config.maneuver.find_wire_distance_cm, heading, speed);
    }

    fn start_mowing(&mut self, pattern: MowPattern, distance_cm: f32) {
        let heading = self.platform.orientation().heading();
        self.state.mow_pattern = pattern;
        self.state.mowing_angle = heading;
        self.state.mowing_direction = angle::wrap(heading - core::f32::consts::FRAC_PI_2);
        self.state.set_activity(Activity::Mowing(MowState::Line));
        self.platform
            .motion()
            .travel_line_distance(distance_cm, heading, FULL_SPEED);
    }

    /// Applies an operator command, between ticks
    pub fn apply(&mut self, command: Command) {
        debug!("command {:?}", command);
        match command {
            Command::Stop => self.set_idle(),
            Command::SetMotorPower { left, right } => self.platform.motion().set_power(left, right),
            Command::TravelDistance {
                distance_cm,
                heading,
                speed,
            } => self
                .platform
                .motion()
                .travel_line_distance(distance_cm, angle::wrap(heading), speed),
            Command::TravelTime {
                duration_ms,
                heading,
                speed,
            } => self
                .platform
                .motion()
                .travel_line_time(duration_ms, angle::wrap(heading), speed),
            Command::RotateBy { angle: by, speed } => {
                let target = angle::wrap(self.platform.orientation().heading() + by);
                self.platform.motion().rotate_angle(target, speed);
            }
            Command::RotateTime { duration_ms, speed } => self.platform.motion().rotate_time(duration_ms, speed),
            Command::CalibrateGyro => self.state.calibration_requested = true,
            Command::StartTracking { clockwise } => {
                self.state.track_clockwise = clockwise;
                self.start_tracking_forever();
            }
            Command::StartMapping => self.start_mapping(),
            Command::StartMappingThen(pattern) => self.start_mapping_then(pattern),
            Command::StartLaneMowing => self.start_lane_mowing(),
            Command::StartRandomMowing => self.start_random_mowing(),
            Command::DistributeParticles => self.platform.mapper().distribute_particles_along_outline(),
            Command::SetSpeeds {
                reverse,
                rotation,
                track,
                track_rotation,
            } => {
                self.state.speed.reverse = reverse;
                self.state.speed.rotation = rotation;
                self.state.speed.track = track;
                self.state.speed.track_rotation = track_rotation;
            }
            Command::SetTrackingSense { clockwise } => self.state.track_clockwise = clockwise,
            Command::RemoteControl => {
                self.platform.motion().stop_immediately();
                self.state.set_activity(Activity::RemoteControl);
            }
            Command::ChargerDisconnected => {
                if self.state.activity == Activity::Charging {
                    self.state.set_activity(Activity::Idle);
                }
            }
        }
    }

    /// One control decision (5 Hz)
    pub fn control_tick(&mut self, now_ms: u64) {
        let state = &mut self.state;
        let platform = &mut self.platform;

        safety::check_charger(state, platform);
        safety::calibration(state, platform);
        platform.mapper().update();

        if !safety::check_faults(state, platform, &self.config.safety) {
            let next = match state.activity {
                Activity::Tracking(_) | Activity::CreatingMap(_) => {
                    tracking::step(state, platform, &self.config.maneuver)
                }
                Activity::Mowing(_) => mowing::step(state, platform, &self.config.maneuver, now_ms),
                idle => idle,
            };
            state.set_activity(next);
        }

        state.control_ticks = state.control_ticks.saturating_add(1);
    }

    /// Orientation fusion step (100 Hz)
    pub fn orientation_tick(&mut self) {
        self.platform.orientation().update();
    }

    /// Telemetry cycle (1 Hz): latches the tick rate, snapshots, clears the triggers
    pub fn telemetry(&mut self, now_ms: u64) -> Telemetry {
        self.state.ticks_per_second = self.state.control_ticks;
        self.state.control_ticks = 0;
        let snapshot = self.state.snapshot(now_ms);
        self.state.triggers.clear();
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpeedConfig;
    use crate::service::AlarmKind;
    use crate::state::{RobotMode, SensorTriggers};
    use crate::testing::{FakePlatform, MotionCall, INSIDE, OUTSIDE};
    use approx::assert_abs_diff_eq;
    use core::f32::consts::{FRAC_PI_2, PI};

    fn controller() -> Controller<FakePlatform> {
        let mut platform = FakePlatform::new();
        platform.set_magnitudes(INSIDE, INSIDE);
        Controller::new(ControllerConfig::default(), platform).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = ControllerConfig::default();
        config.speed.track = 1.5;
        assert!(Controller::new(config, FakePlatform::new()).is_err());
    }

    #[test]
    fn set_idle_from_any_state_only_stops() {
        let activities = [
            Activity::Idle,
            Activity::CalibratingGyro,
            Activity::Tracking(TrackState::Find),
            Activity::Tracking(TrackState::Run),
            Activity::CreatingMap(TrackState::Rotate),
            Activity::Mowing(MowState::Line),
            Activity::Mowing(MowState::Reverse),
            Activity::Mowing(MowState::Rotate),
            Activity::Mowing(MowState::EnterLine),
            Activity::RemoteControl,
            Activity::Charging,
        ];
        for activity in activities {
            let mut controller = controller();
            controller.state.activity = activity;
            controller.state.mowing_angle = 0.5;

            controller.set_idle();

            assert_eq!(controller.state().mode(), RobotMode::Idle);
            assert_eq!(controller.platform().motion_calls(), &[MotionCall::Stop]);
            assert!(controller.platform().alarm.sounded().is_empty());
            assert_eq!(controller.platform().mapper.clears, 0);
            assert_eq!(controller.state().mowing_angle(), 0.5);
        }
    }

    #[test]
    fn lane_start_at_heading_zero() {
        let mut controller = controller();
        controller.platform_mut().orientation.heading = 0.0;

        controller.start_lane_mowing();

        let state = controller.state();
        assert_eq!(state.activity(), Activity::Mowing(MowState::Line));
        assert_eq!(state.mowing_angle(), 0.0);
        assert_abs_diff_eq!(state.mowing_direction(), -FRAC_PI_2, epsilon = 1e-6);
        assert_eq!(state.mow_pattern(), MowPattern::Lanes);
        assert_eq!(
            controller.platform().motion_calls(),
            &[MotionCall::TravelDistance {
                distance_cm: 3000.0,
                heading: 0.0,
                speed: 1.0
            }]
        );
    }

    #[test]
    fn random_start_runs_long_line() {
        let mut controller = controller();
        controller.platform_mut().orientation.heading = -3.0;

        controller.start_random_mowing();

        assert_eq!(controller.state().mow_pattern(), MowPattern::Random);
        assert_abs_diff_eq!(
            controller.state().mowing_direction(),
            angle::wrap(-3.0 - FRAC_PI_2),
            epsilon = 1e-6
        );
        assert_eq!(
            controller.platform().motion_calls(),
            &[MotionCall::TravelDistance {
                distance_cm: 100_000.0,
                heading: -3.0,
                speed: 1.0
            }]
        );
    }

    #[test]
    fn mapping_clears_outline_and_heads_for_the_wire() {
        let mut controller = controller();
        controller.platform_mut().orientation.heading = 1.0;

        controller.start_mapping();

        assert_eq!(controller.state().activity(), Activity::CreatingMap(TrackState::Find));
        assert_eq!(controller.platform().mapper.clears, 1);
        assert_eq!(
            controller.platform().motion_calls(),
            &[MotionCall::TravelDistance {
                distance_cm: 10_000.0,
                heading: 1.0,
                speed: 0.5
            }]
        );
    }

    #[test]
    fn tracking_forever_drops_the_mow_pattern() {
        let mut controller = controller();
        controller.start_mapping_then(MowPattern::Lanes);
        assert_eq!(controller.state().mow_pattern(), MowPattern::Lanes);

        controller.apply(Command::StartTracking { clockwise: false });

        assert_eq!(controller.state().mow_pattern(), MowPattern::None);
        assert!(!controller.state().track_clockwise());
        assert_eq!(controller.state().activity(), Activity::Tracking(TrackState::Find));
    }

    #[test]
    fn rotate_by_is_relative_and_wrapped() {
        let mut controller = controller();
        controller.platform_mut().orientation.heading = 3.0;

        controller.apply(Command::RotateBy { angle: 1.0, speed: 0.4 });

        match controller.platform().motion_calls() {
            [MotionCall::RotateAngle { target, speed }] => {
                assert_abs_diff_eq!(*target, 4.0 - 2.0 * PI, epsilon = 1e-5);
                assert_eq!(*speed, 0.4);
            }
            other => panic!("unexpected calls {:?}", other),
        }
    }

    #[test]
    fn speeds_and_sense_are_replaced() {
        let mut controller = controller();
        controller.apply(Command::SetSpeeds {
            reverse: 0.1,
            rotation: 0.2,
            track: 0.3,
            track_rotation: 0.4,
        });
        controller.apply(Command::SetTrackingSense { clockwise: false });

        assert_eq!(
            controller.state().speed(),
            SpeedConfig {
                track: 0.3,
                track_rotation: 0.4,
                rotation: 0.2,
                reverse: 0.1,
            }
        );
        assert!(!controller.state().track_clockwise());
    }

    #[test]
    fn remote_control_and_charger_are_passive() {
        let mut controller = controller();
        controller.apply(Command::RemoteControl);
        assert_eq!(controller.state().mode(), RobotMode::RemoteControl);

        controller.apply(Command::ChargerDisconnected);
        assert_eq!(controller.state().mode(), RobotMode::RemoteControl);

        controller.platform_mut().charger.connected = true;
        controller.control_tick(0);
        assert_eq!(controller.state().mode(), RobotMode::Charging);

        controller.control_tick(200);
        assert_eq!(controller.state().mode(), RobotMode::Charging);

        controller.platform_mut().charger.connected = false;
        controller.apply(Command::ChargerDisconnected);
        assert_eq!(controller.state().mode(), RobotMode::Idle);
    }

    #[test]
    fn safety_runs_before_dispatch() {
        let mut controller = controller();
        controller.start_lane_mowing();
        controller.platform_mut().clear_calls();
        controller.platform_mut().set_magnitudes(OUTSIDE, OUTSIDE);
        controller.platform_mut().wire.timed_out = true;

        controller.control_tick(200);

        // no reverse issued after the timeout stop
        assert_eq!(controller.state().mode(), RobotMode::Idle);
        assert_eq!(controller.platform().motion_calls(), &[MotionCall::Stop]);
        assert_eq!(controller.platform().alarm.sounded(), &[AlarmKind::WireTimeout]);
    }

    #[test]
    fn control_tick_dispatches_and_updates_mapper() {
        let mut controller = controller();
        controller.start_tracking_forever();
        controller.platform_mut().set_magnitudes(OUTSIDE, INSIDE);

        controller.control_tick(200);

        assert_eq!(controller.state().activity(), Activity::Tracking(TrackState::Run));
        assert_eq!(controller.platform().mapper.updates, 1);
    }

    #[test]
    fn telemetry_latches_tick_rate_and_clears_triggers() {
        let mut controller = controller();
        controller.start_random_mowing();
        controller.platform_mut().set_magnitudes(OUTSIDE, INSIDE);
        for tick in 0..5 {
            controller.control_tick(tick * 200);
        }

        let snapshot = controller.telemetry(1000);

        assert_eq!(snapshot.ticks_per_second, 5);
        assert!(snapshot.sensor_triggers.contains(SensorTriggers::PERIMETER_LEFT));
        assert!(controller.state().sensor_triggers().is_empty());
        assert_eq!(controller.telemetry(2000).ticks_per_second, 0);
    }

    #[test]
    fn calibrate_command_interrupts_and_resumes() {
        let mut controller = controller();
        controller.start_tracking_forever();
        controller.apply(Command::CalibrateGyro);

        controller.control_tick(200);
        assert_eq!(controller.state().mode(), RobotMode::CalibratingGyro);

        controller.platform_mut().orientation.finish_calibration();
        controller.control_tick(400);
        assert_eq!(controller.state().mode(), RobotMode::Tracking);
    }

    #[test]
    fn wire_silence_during_calibration_is_forgiven_on_resume() {
        let mut controller = controller();
        controller.start_lane_mowing();
        controller.apply(Command::CalibrateGyro);
        controller.control_tick(200);
        assert_eq!(controller.state().mode(), RobotMode::CalibratingGyro);

        // motors paused long enough for the wire watchdog to expire
        controller.platform_mut().wire.timed_out = true;
        controller.platform_mut().orientation.finish_calibration();
        controller.platform_mut().clear_calls();
        controller.control_tick(20_000);

        assert_eq!(controller.state().mode(), RobotMode::Mowing);
        assert_eq!(controller.platform().wire.timeout_resets, 1);
        assert!(!controller.platform().wire.timed_out);
        assert!(controller.platform().alarm.sounded().is_empty());
        assert!(!controller.state().sensor_triggers().contains(SensorTriggers::WIRE_TIMEOUT));
        assert!(!controller.platform().motion_calls().contains(&MotionCall::Stop));
    }
}
