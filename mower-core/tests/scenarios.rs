//! End-to-end scenarios driven through the scheduler with a mock clock

use approx::assert_abs_diff_eq;
use core::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use mower_core::angle;
use mower_core::clock::{Clock, MockClock};
use mower_core::random::WyRandSource;
use mower_core::config::ControllerConfig;
use mower_core::controller::Controller;
use mower_core::scheduler::Scheduler;
use mower_core::service::AlarmKind;
use mower_core::state::{Activity, MowPattern, MowState, RobotMode, SensorTriggers, TrackState};
use mower_core::testing::{FakePlatform, MotionCall, NullTelemetry, RecordingTelemetry, INSIDE, OUTSIDE};

struct Rig {
    controller: Controller<FakePlatform>,
}

impl Rig {
    fn new() -> Self {
        Self {
            controller: Controller::new(ControllerConfig::default(), FakePlatform::new()).unwrap(),
        }
    }

    fn platform(&mut self) -> &mut FakePlatform {
        self.controller.platform_mut()
    }

    fn calls(&self) -> &[MotionCall] {
        self.controller.platform().motion_calls()
    }

    /// Polls once per millisecond for `ms` milliseconds
    fn run(&mut self, scheduler: &mut Scheduler<&MockClock>, clock: &MockClock, ms: u64) {
        for _ in 0..ms {
            scheduler.poll(&mut self.controller, &mut NullTelemetry);
            clock.advance(1);
        }
    }
}

fn scheduler(clock: &MockClock) -> Scheduler<&MockClock> {
    Scheduler::new(clock, ControllerConfig::default().scheduler)
}

#[test]
fn lane_mowing_cycle() {
    let mut rig = Rig::new();
    let clock = MockClock::starting_at(10_000);
    let mut scheduler = scheduler(&clock);
    rig.platform().orientation.heading = 0.0;
    rig.controller.start_lane_mowing();

    // straight run inside the loop
    scheduler.poll(&mut rig.controller, &mut NullTelemetry);
    assert_eq!(rig.controller.state().mow_state(), Some(MowState::Line));

    // wire crossed on the right: stop and back off
    rig.platform().clear_calls();
    rig.platform().set_magnitudes(INSIDE, OUTSIDE);
    clock.advance(200);
    scheduler.poll(&mut rig.controller, &mut NullTelemetry);
    assert_eq!(rig.controller.state().mow_state(), Some(MowState::Reverse));
    assert_eq!(
        rig.calls(),
        &[
            MotionCall::Stop,
            MotionCall::TravelDistance {
                distance_cm: 50.0,
                heading: 0.0,
                speed: -0.3
            }
        ]
    );

    // reverse done: 10 s since the (boot time) lane start, so advance by π
    rig.platform().clear_calls();
    rig.platform().set_magnitudes(INSIDE, INSIDE);
    rig.platform().motion.stopped = true;
    clock.advance(200);
    scheduler.poll(&mut rig.controller, &mut NullTelemetry);
    let state = rig.controller.state();
    assert_eq!(state.mow_state(), Some(MowState::Rotate));
    assert_abs_diff_eq!(state.mowing_angle(), PI, epsilon = 1e-5);
    assert_abs_diff_eq!(state.mowing_direction(), -FRAC_PI_2, epsilon = 1e-5);
    assert_abs_diff_eq!(state.rotate_angle(), -3.0 * FRAC_PI_4, epsilon = 1e-5);

    // turned: short entry run on the skewed heading
    rig.platform().clear_calls();
    rig.platform().motion.stopped = true;
    clock.advance(200);
    scheduler.poll(&mut rig.controller, &mut NullTelemetry);
    assert_eq!(rig.controller.state().mow_state(), Some(MowState::EnterLine));
    match rig.calls() {
        [MotionCall::TravelDistance {
            distance_cm,
            heading,
            speed,
        }] => {
            assert_eq!(*distance_cm, 15.0);
            assert_abs_diff_eq!(*heading, -3.0 * FRAC_PI_4, epsilon = 1e-5);
            assert_eq!(*speed, 1.0);
        }
        other => panic!("unexpected calls {:?}", other),
    }

    // entered the lane: long run back along π, lane start recorded
    rig.platform().clear_calls();
    rig.platform().motion.stopped = true;
    clock.advance(200);
    scheduler.poll(&mut rig.controller, &mut NullTelemetry);
    assert_eq!(rig.controller.state().mow_state(), Some(MowState::Line));
    assert_eq!(rig.controller.state().last_line_start_ms(), clock.now_ms());
}

#[test]
fn blocked_lane_turns_perpendicular() {
    let mut rig = Rig::new();
    let clock = MockClock::starting_at(20_000);
    let mut scheduler = scheduler(&clock);
    rig.controller.start_lane_mowing();
    scheduler.poll(&mut rig.controller, &mut NullTelemetry);

    // walk one full cycle so the lane start is recorded
    for _ in 0..3 {
        rig.platform().motion.stopped = true;
        clock.advance(200);
        scheduler.poll(&mut rig.controller, &mut NullTelemetry);
    }
    assert_eq!(rig.controller.state().mow_state(), Some(MowState::EnterLine));
    rig.platform().motion.stopped = true;
    clock.advance(200);
    scheduler.poll(&mut rig.controller, &mut NullTelemetry);
    assert_eq!(rig.controller.state().mow_state(), Some(MowState::Line));
    let direction = rig.controller.state().mowing_direction();

    // blocked 4 s into the lane
    clock.advance(3_800);
    rig.platform().motion.stopped = true;
    scheduler.poll(&mut rig.controller, &mut NullTelemetry);
    assert_eq!(rig.controller.state().mow_state(), Some(MowState::Reverse));
    clock.advance(200);
    rig.platform().motion.stopped = true;
    scheduler.poll(&mut rig.controller, &mut NullTelemetry);

    let state = rig.controller.state();
    let expected_angle = angle::wrap(direction + PI);
    assert_abs_diff_eq!(state.mowing_angle(), expected_angle, epsilon = 1e-5);
    assert_abs_diff_eq!(
        state.mowing_direction(),
        angle::wrap(expected_angle - FRAC_PI_2),
        epsilon = 1e-5
    );
}

#[test]
fn random_reflection_stays_within_ninety_degrees() {
    for offset in [-200, -90, -45, 0, 30, 90, 200] {
        let mut rig = Rig::new();
        let clock = MockClock::new();
        let mut scheduler = scheduler(&clock);
        rig.platform().orientation.heading = 2.5;
        rig.controller.start_random_mowing();
        rig.platform().random.push(offset);

        // line stopped by an obstacle, then reverse completes
        rig.platform().motion.stopped = true;
        scheduler.poll(&mut rig.controller, &mut NullTelemetry);
        rig.platform().motion.stopped = true;
        clock.advance(200);
        scheduler.poll(&mut rig.controller, &mut NullTelemetry);

        let state = rig.controller.state();
        assert_eq!(state.mow_state(), Some(MowState::Rotate));
        let reflected = angle::wrap(2.5 + PI);
        let deviation = angle::distance(reflected, state.mowing_angle());
        assert!(deviation.abs() <= FRAC_PI_2 + 1e-5, "offset {} gave {}", offset, deviation);
        assert_eq!(state.rotate_angle(), state.mowing_angle());
    }
}

#[test]
fn seeded_random_mowing_never_reflects_past_ninety_degrees() {
    let platform = FakePlatform::with_random(WyRandSource::new(0xC0FFEE));
    let mut controller = Controller::new(ControllerConfig::default(), platform).unwrap();
    let clock = MockClock::new();
    let mut scheduler = scheduler(&clock);
    controller.platform_mut().orientation.heading = -1.0;
    controller.start_random_mowing();

    let mut widest: f32 = 0.0;
    for bounce in 0..2_000 {
        let previous = controller.state().mowing_angle();

        // Line -> Reverse -> Rotate, each step completing its motion
        for _ in 0..2 {
            controller.platform_mut().motion.stopped = true;
            clock.advance(200);
            scheduler.poll(&mut controller, &mut NullTelemetry);
        }
        assert_eq!(controller.state().mow_state(), Some(MowState::Rotate));

        let deviation = angle::distance(angle::wrap(previous + PI), controller.state().mowing_angle());
        assert!(deviation.abs() <= FRAC_PI_2 + 1e-4, "bounce {} deviated {}", bounce, deviation);
        widest = widest.max(deviation.abs());

        // rotation done, back to a straight run
        controller.platform_mut().motion.stopped = true;
        clock.advance(200);
        scheduler.poll(&mut controller, &mut NullTelemetry);
        assert_eq!(controller.state().mow_state(), Some(MowState::Line));
    }
    assert!(widest > FRAC_PI_2 - 0.05);
}

#[test]
fn wire_timeout_while_tracking_stops_once() {
    let mut rig = Rig::new();
    let clock = MockClock::new();
    let mut scheduler = scheduler(&clock);
    rig.controller.start_tracking_forever();
    rig.run(&mut scheduler, &clock, 500);
    assert_eq!(rig.controller.state().mode(), RobotMode::Tracking);
    rig.platform().clear_calls();
    rig.platform().wire.timed_out = true;

    rig.run(&mut scheduler, &clock, 2_000);

    assert_eq!(rig.controller.state().mode(), RobotMode::Idle);
    assert_eq!(rig.calls(), &[MotionCall::Stop]);
    assert_eq!(rig.controller.platform().alarm.sounded(), &[AlarmKind::WireTimeout]);
}

#[test]
fn tilt_during_mowing_is_caught_within_one_tick() {
    let mut rig = Rig::new();
    let clock = MockClock::new();
    let mut scheduler = scheduler(&clock);
    rig.controller.start_random_mowing();
    rig.platform().motion.stopped = false;
    scheduler.poll(&mut rig.controller, &mut NullTelemetry);

    rig.platform().orientation.pitch = angle::from_degrees(31.0);
    let mut sink = RecordingTelemetry::new();
    for _ in 0..200 {
        clock.advance(1);
        scheduler.poll(&mut rig.controller, &mut sink);
    }

    assert_eq!(rig.controller.state().mode(), RobotMode::Idle);
    assert_eq!(rig.controller.platform().alarm.sounded(), &[AlarmKind::Tilt]);
    assert!(rig.controller.state().sensor_triggers().contains(SensorTriggers::TILT));
}

#[test]
fn map_then_turn_for_lanes() {
    let mut rig = Rig::new();
    let clock = MockClock::new();
    let mut scheduler = scheduler(&clock);
    rig.platform().orientation.heading = 0.2;
    rig.controller.start_mapping_then(MowPattern::Lanes);
    assert_eq!(rig.platform().mapper.clears, 1);

    // counter-clockwise for readable coil roles; the robot reaches the wire
    rig.controller.apply(mower_core::Command::SetTrackingSense { clockwise: false });
    scheduler.poll(&mut rig.controller, &mut NullTelemetry);
    assert_eq!(rig.controller.state().activity(), Activity::CreatingMap(TrackState::Find));
    rig.platform().set_magnitudes(INSIDE, OUTSIDE);
    clock.advance(200);
    scheduler.poll(&mut rig.controller, &mut NullTelemetry);
    assert_eq!(rig.controller.state().activity(), Activity::CreatingMap(TrackState::Run));
    assert_eq!(rig.platform().mapper.particle_distributions, 1);

    // follow the wire for a while
    for _ in 0..10 {
        clock.advance(200);
        scheduler.poll(&mut rig.controller, &mut NullTelemetry);
    }
    assert_eq!(rig.platform().mapper.saves, 0);

    // back at the start point
    rig.platform().mapper.distance_to_origin = 0.2;
    rig.platform().orientation.heading = 1.0;
    clock.advance(200);
    scheduler.poll(&mut rig.controller, &mut NullTelemetry);
    assert_eq!(rig.controller.state().activity(), Activity::CreatingMap(TrackState::Rotate));
    assert_eq!(rig.platform().mapper.saves, 1);
    assert_eq!(rig.controller.platform().alarm.sounded(), &[AlarmKind::Ready]);

    // turn finished
    rig.platform().orientation.heading = 1.0 + FRAC_PI_2;
    rig.platform().motion.stopped = true;
    clock.advance(200);
    scheduler.poll(&mut rig.controller, &mut NullTelemetry);
    let state = rig.controller.state();
    assert_eq!(state.mode(), RobotMode::Idle);
    assert_abs_diff_eq!(state.mowing_angle(), 1.0 + FRAC_PI_2, epsilon = 1e-6);
    assert_abs_diff_eq!(state.mowing_direction(), 1.0, epsilon = 1e-6);
}

#[test]
fn telemetry_reports_once_per_second() {
    let mut rig = Rig::new();
    let clock = MockClock::new();
    let mut scheduler = scheduler(&clock);
    let mut sink = RecordingTelemetry::new();
    rig.controller.start_random_mowing();
    rig.platform().set_magnitudes(OUTSIDE, INSIDE);

    for _ in 0..3_000 {
        scheduler.poll(&mut rig.controller, &mut sink);
        clock.advance(1);
    }

    assert_eq!(sink.len(), 3);
    let latest = sink.last().unwrap();
    assert_eq!(latest.timestamp_ms, 2_000);
    assert_eq!(latest.ticks_per_second, 5);
    assert_eq!(latest.mode, RobotMode::Mowing);
    assert!(latest.sensor_triggers.contains(SensorTriggers::PERIMETER_LEFT));
}
