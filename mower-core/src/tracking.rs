//! Wire following
//!
//! Used by "track forever" and by map creation. The robot drives straight
//! until a coil crosses the wire, then alternates 300 ms straight pulses with
//! 300 ms rotation pulses to stay on the boundary. While mapping, the loop
//! closes once the robot is back near the point where the outline started.

use crate::angle;
use crate::config::ManeuverConfig;
use crate::service::{Alarm, AlarmKind, BoundaryMapper, Motion, Orientation, Platform, Side, WireGuidance};
use crate::state::{Activity, ControllerState, MowPattern, TrackState};

/// Inside/outside view of the two coils from the side the robot works on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoilView {
    pub left_in: bool,
    pub right_in: bool,
    /// +1 counter-clockwise, −1 clockwise
    pub rotation_sign: f32,
}

/// Maps raw magnitudes to the tracking view
///
/// Clockwise tracking swaps the coil roles and the rotation sign together.
pub fn coil_view(left_magnitude: f32, right_magnitude: f32, clockwise: bool) -> CoilView {
    if clockwise {
        CoilView {
            left_in: right_magnitude < 0.0,
            right_in: left_magnitude < 0.0,
            rotation_sign: -1.0,
        }
    } else {
        CoilView {
            left_in: left_magnitude < 0.0,
            right_in: right_magnitude < 0.0,
            rotation_sign: 1.0,
        }
    }
}

/// Runs one control tick of the tracking state machine and returns the next activity
///
/// Activities other than `Tracking` and `CreatingMap` pass through unchanged.
pub(crate) fn step<P: Platform>(
    state: &mut ControllerState,
    platform: &mut P,
    maneuver: &ManeuverConfig,
) -> Activity {
    let (mapping, track) = match state.activity {
        Activity::Tracking(track) => (false, track),
        Activity::CreatingMap(track) => (true, track),
        other => return other,
    };

    let coils = {
        let wire = platform.wire();
        coil_view(
            wire.magnitude(Side::Left),
            wire.magnitude(Side::Right),
            state.track_clockwise,
        )
    };

    match track {
        TrackState::Find => {
            let next = find(state, platform, coils);
            if mapping {
                Activity::CreatingMap(next)
            } else {
                Activity::Tracking(next)
            }
        }
        TrackState::Run => run(state, platform, maneuver, coils, mapping),
        TrackState::Rotate => rotate(state, platform, mapping),
    }
}

fn find<P: Platform>(state: &mut ControllerState, platform: &mut P, coils: CoilView) -> TrackState {
    if coils.left_in && coils.right_in {
        return TrackState::Find;
    }
    platform.motion().stop_immediately();
    state.track_angle = platform.orientation().heading();
    platform.mapper().distribute_particles_along_outline();
    debug!("wire found at heading {}", state.track_angle);
    TrackState::Run
}

fn run<P: Platform>(
    state: &mut ControllerState,
    platform: &mut P,
    maneuver: &ManeuverConfig,
    coils: CoilView,
    mapping: bool,
) -> Activity {
    if coils.left_in && !coils.right_in {
        platform
            .motion()
            .travel_line_time(maneuver.track_pulse_ms, state.track_angle, state.speed.track);
    } else {
        let speed = if !coils.left_in {
            coils.rotation_sign * state.speed.track_rotation
        } else {
            coils.rotation_sign * -state.speed.track_rotation
        };
        platform.motion().rotate_time(maneuver.track_pulse_ms, speed);
        state.track_angle = platform.orientation().heading();
    }

    if !mapping {
        return Activity::Tracking(TrackState::Run);
    }

    let start_distance = {
        let mapper = platform.mapper();
        let (x, y) = mapper.robot_position();
        mapper.distance_to_map_origin(x, y)
    };
    if start_distance >= maneuver.loop_closure_distance {
        return Activity::CreatingMap(TrackState::Run);
    }

    close_loop(state, platform, maneuver)
}

/// Boundary is complete: persist it and either idle or turn for the follow-up pattern
fn close_loop<P: Platform>(state: &mut ControllerState, platform: &mut P, maneuver: &ManeuverConfig) -> Activity {
    platform.motion().stop_immediately();
    platform.alarm().sound(AlarmKind::Ready);

    let mapper = platform.mapper();
    mapper.correct_outline();
    mapper.commit_outline_to_map();
    mapper.save_map();
    info!("boundary loop closed, map saved");

    if state.mow_pattern == MowPattern::None {
        return Activity::Idle;
    }

    let target = angle::wrap(platform.orientation().heading() + maneuver.post_map_turn);
    platform
        .motion()
        .rotate_angle(target, libm::fabsf(state.speed.track_rotation));
    Activity::CreatingMap(TrackState::Rotate)
}

fn rotate<P: Platform>(state: &mut ControllerState, platform: &mut P, mapping: bool) -> Activity {
    if !platform.motion().is_stopped() {
        return if mapping {
            Activity::CreatingMap(TrackState::Rotate)
        } else {
            Activity::Tracking(TrackState::Rotate)
        };
    }
    let heading = platform.orientation().heading();
    state.mowing_angle = heading;
    state.mowing_direction = angle::wrap(heading - core::f32::consts::FRAC_PI_2);
    Activity::Idle
}
