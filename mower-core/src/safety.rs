//! Safety interlocks
//!
//! Checked at the start of every control tick, before the state machines get
//! a chance to issue a motion command. A fault drives the robot back to idle
//! with an immediate stop and an alarm tone; any later command recovers.

use crate::config::SafetyConfig;
use crate::service::{Alarm, AlarmKind, Charger, Motion, Orientation, Platform, WireGuidance};
use crate::state::{Activity, ControllerState, RobotMode, SensorTriggers};

/// True when roll or pitch (radians) lies strictly beyond `limit_deg`
pub fn tilt_exceeded(roll: f32, pitch: f32, limit_deg: f32) -> bool {
    let limit = limit_deg.to_radians();
    libm::fabsf(roll) > limit || libm::fabsf(pitch) > limit
}

/// Modes in which the fault checks are suspended
fn faults_suspended(mode: RobotMode) -> bool {
    matches!(
        mode,
        RobotMode::Idle | RobotMode::CalibratingGyro | RobotMode::Charging | RobotMode::RemoteControl
    )
}

/// Stops the robot and falls back to idle
pub(crate) fn go_idle<P: Platform>(state: &mut ControllerState, platform: &mut P) {
    state.set_activity(Activity::Idle);
    platform.motion().stop_immediately();
}

/// Enters `Charging` as soon as the robot sits on a powered station
///
/// Returns true when the charging mode was entered on this call.
pub(crate) fn check_charger<P: Platform>(state: &mut ControllerState, platform: &mut P) -> bool {
    if state.mode() == RobotMode::Charging || !platform.charger().is_connected() {
        return false;
    }
    platform.motion().stop_immediately();
    state.triggers.insert(SensorTriggers::CHARGER);
    state.set_activity(Activity::Charging);
    true
}

/// Gyro calibration interlock
///
/// Pauses whatever the robot is doing while the gyro bias is re-estimated and
/// resumes the interrupted activity once the orientation service is done.
pub(crate) fn calibration<P: Platform>(state: &mut ControllerState, platform: &mut P) {
    let wanted = state.calibration_requested || platform.orientation().needs_calibration();
    if wanted && state.mode() != RobotMode::RemoteControl && state.mode() != RobotMode::CalibratingGyro {
        state.previous = state.activity;
        state.paused = true;
        state.calibration_requested = false;
        platform.motion().set_paused(true);
        platform.orientation().start_calibration();
        state.set_activity(Activity::CalibratingGyro);
    }

    if state.paused && !platform.orientation().is_calibrating() {
        if state.activity == Activity::CalibratingGyro {
            let resume = state.previous;
            state.set_activity(resume);
        }
        state.paused = false;
        platform.motion().set_paused(false);
        platform.wire().reset_timeout();
        info!("gyro calibration done");
    }
}

/// Wire timeout and tilt checks
///
/// Returns true when a fault forced the robot idle. The timeout check runs
/// first; a tick that already stopped the robot does not stop it again.
pub(crate) fn check_faults<P: Platform>(state: &mut ControllerState, platform: &mut P, config: &SafetyConfig) -> bool {
    if faults_suspended(state.mode()) {
        return false;
    }

    if platform.wire().signal_timed_out() {
        warn!("perimeter timeout in {:?}", state.mode());
        state.triggers.insert(SensorTriggers::WIRE_TIMEOUT);
        go_idle(state, platform);
        platform.alarm().sound(AlarmKind::WireTimeout);
        return true;
    }

    let (roll, pitch) = platform.orientation().roll_pitch();
    if tilt_exceeded(roll, pitch, config.tilt_limit_deg) {
        warn!("tilt roll={} pitch={}", roll, pitch);
        state.triggers.insert(SensorTriggers::TILT);
        go_idle(state, platform);
        platform.alarm().sound(AlarmKind::Tilt);
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::from_degrees;
    use crate::config::SpeedConfig;
    use crate::state::{MowState, TrackState};
    use crate::testing::{FakePlatform, MotionCall};

    fn in_activity(activity: Activity) -> ControllerState {
        let mut state = ControllerState::new(SpeedConfig::default());
        state.activity = activity;
        state
    }

    #[test]
    fn tilt_limit_is_strict() {
        assert!(tilt_exceeded(from_degrees(31.0), 0.0, 30.0));
        assert!(tilt_exceeded(0.0, from_degrees(-31.0), 30.0));
        assert!(!tilt_exceeded(from_degrees(29.0), from_degrees(29.0), 30.0));
    }

    #[test]
    fn tilt_forces_idle_with_alarm() {
        let mut state = in_activity(Activity::Mowing(MowState::Line));
        let mut platform = FakePlatform::new();
        platform.orientation.roll = from_degrees(31.0);

        assert!(check_faults(&mut state, &mut platform, &SafetyConfig::default()));

        assert_eq!(state.mode(), RobotMode::Idle);
        assert_eq!(platform.motion_calls(), &[MotionCall::Stop]);
        assert_eq!(platform.alarm.sounded(), &[AlarmKind::Tilt]);
        assert!(state.triggers.contains(SensorTriggers::TILT));
    }

    #[test]
    fn moderate_slope_is_tolerated() {
        let mut state = in_activity(Activity::Tracking(TrackState::Run));
        let mut platform = FakePlatform::new();
        platform.orientation.roll = from_degrees(29.0);
        platform.orientation.pitch = from_degrees(29.0);

        assert!(!check_faults(&mut state, &mut platform, &SafetyConfig::default()));
        assert_eq!(state.mode(), RobotMode::Tracking);
        assert!(platform.motion_calls().is_empty());
    }

    #[test]
    fn wire_timeout_fires_once() {
        let mut state = in_activity(Activity::Tracking(TrackState::Run));
        let mut platform = FakePlatform::new();
        platform.wire.timed_out = true;
        platform.orientation.roll = from_degrees(45.0);

        assert!(check_faults(&mut state, &mut platform, &SafetyConfig::default()));
        assert!(!check_faults(&mut state, &mut platform, &SafetyConfig::default()));

        assert_eq!(state.mode(), RobotMode::Idle);
        assert_eq!(platform.motion_calls(), &[MotionCall::Stop]);
        assert_eq!(platform.alarm.sounded(), &[AlarmKind::WireTimeout]);
    }

    #[test]
    fn faults_ignored_in_passive_modes() {
        for activity in [
            Activity::Idle,
            Activity::CalibratingGyro,
            Activity::Charging,
            Activity::RemoteControl,
        ] {
            let mut state = in_activity(activity);
            let mut platform = FakePlatform::new();
            platform.wire.timed_out = true;
            platform.orientation.pitch = from_degrees(60.0);

            assert!(!check_faults(&mut state, &mut platform, &SafetyConfig::default()));
            assert_eq!(state.activity, activity);
            assert!(platform.alarm.sounded().is_empty());
        }
    }

    #[test]
    fn charger_connection_stops_and_charges() {
        let mut state = in_activity(Activity::Mowing(MowState::Line));
        let mut platform = FakePlatform::new();
        platform.charger.connected = true;

        assert!(check_charger(&mut state, &mut platform));
        assert!(!check_charger(&mut state, &mut platform));

        assert_eq!(state.mode(), RobotMode::Charging);
        assert_eq!(platform.motion_calls(), &[MotionCall::Stop]);
    }

    #[test]
    fn calibration_pauses_and_resumes_previous_activity() {
        let mut state = in_activity(Activity::Mowing(MowState::Rotate));
        let mut platform = FakePlatform::new();
        platform.orientation.needs_calibration = true;

        calibration(&mut state, &mut platform);

        assert_eq!(state.activity, Activity::CalibratingGyro);
        assert_eq!(state.previous, Activity::Mowing(MowState::Rotate));
        assert!(platform.motion.paused);
        assert_eq!(platform.orientation.calibrations_started, 1);

        // still calibrating: nothing changes, no second start
        calibration(&mut state, &mut platform);
        assert_eq!(state.activity, Activity::CalibratingGyro);
        assert_eq!(platform.orientation.calibrations_started, 1);

        platform.orientation.finish_calibration();
        calibration(&mut state, &mut platform);

        assert_eq!(state.activity, Activity::Mowing(MowState::Rotate));
        assert!(!state.paused);
        assert!(!platform.motion.paused);
        assert_eq!(platform.wire.timeout_resets, 1);
    }

    #[test]
    fn calibration_waits_under_remote_control() {
        let mut state = in_activity(Activity::RemoteControl);
        let mut platform = FakePlatform::new();
        platform.orientation.needs_calibration = true;

        calibration(&mut state, &mut platform);

        assert_eq!(state.activity, Activity::RemoteControl);
        assert_eq!(platform.orientation.calibrations_started, 0);
    }

    #[test]
    fn requested_calibration_is_consumed() {
        let mut state = in_activity(Activity::Idle);
        state.calibration_requested = true;
        let mut platform = FakePlatform::new();

        calibration(&mut state, &mut platform);

        assert_eq!(state.activity, Activity::CalibratingGyro);
        assert!(!state.calibration_requested);
    }

    #[test]
    fn stop_during_calibration_is_kept() {
        let mut state = in_activity(Activity::Tracking(TrackState::Run));
        let mut platform = FakePlatform::new();
        state.calibration_requested = true;
        calibration(&mut state, &mut platform);

        go_idle(&mut state, &mut platform);
        platform.orientation.finish_calibration();
        calibration(&mut state, &mut platform);

        assert_eq!(state.activity, Activity::Idle);
        assert!(!platform.motion.paused);
    }
}
