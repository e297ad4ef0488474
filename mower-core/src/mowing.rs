//! Coverage mowing
//!
//! Straight runs are ended by the perimeter wire or by the motion controller
//! reporting a stop (obstacle, distance reached). After each run the robot
//! backs off, picks the next heading and turns. The lane pattern flips the
//! heading by π and shifts sideways through a 45° entry run; the random
//! pattern reflects with a random offset of up to ±90°.

use core::f32::consts::{FRAC_PI_2, PI};

use crate::angle;
use crate::config::ManeuverConfig;
use crate::random::RandomSource;
use crate::service::{Motion, Platform, Side, WireGuidance};
use crate::state::{Activity, ControllerState, MowPattern, MowState, SensorTriggers};

const FULL_SPEED: f32 = 1.0;

/// Largest random reflection offset in degrees
const RANDOM_OFFSET_DEG: i32 = 90;

/// Headings chosen for the next lane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneTurn {
    pub mowing_angle: f32,
    pub mowing_direction: f32,
    pub rotate_angle: f32,
}

/// Next lane after a reverse
///
/// A lane that lasted less than `short_lane_ms` means the robot was blocked
/// early, so the lanes restart perpendicular to the old progress direction.
/// Otherwise the heading flips by π. The turn target is skewed by
/// `lane_entry_skew` toward the progress direction so the next lane is offset
/// from the one just mowed.
pub fn next_lane(mowing_angle: f32, mowing_direction: f32, elapsed_ms: u64, maneuver: &ManeuverConfig) -> LaneTurn {
    let (mowing_angle, mowing_direction) = if elapsed_ms < maneuver.short_lane_ms {
        let angle = angle::wrap(mowing_direction + PI);
        (angle, angle::wrap(angle - FRAC_PI_2))
    } else {
        (angle::wrap(mowing_angle + PI), mowing_direction)
    };

    let delta = angle::distance(mowing_angle, mowing_direction);
    let rotate_angle = if delta > 0.0 {
        angle::wrap(mowing_angle + maneuver.lane_entry_skew)
    } else {
        angle::wrap(mowing_angle - maneuver.lane_entry_skew)
    };

    LaneTurn {
        mowing_angle,
        mowing_direction,
        rotate_angle,
    }
}

/// Reflected heading for the random pattern, `offset_deg` in [−90, 90]
pub fn random_heading(mowing_angle: f32, offset_deg: i32) -> f32 {
    angle::wrap(mowing_angle + PI + angle::from_degrees(offset_deg as f32))
}

/// Runs one control tick of the mowing state machine and returns the next activity
///
/// Activities other than `Mowing` pass through unchanged.
pub(crate) fn step<P: Platform>(
    state: &mut ControllerState,
    platform: &mut P,
    maneuver: &ManeuverConfig,
    now_ms: u64,
) -> Activity {
    let Activity::Mowing(mow) = state.activity else {
        return state.activity;
    };

    let (left_in, right_in) = {
        let wire = platform.wire();
        (wire.is_inside(Side::Left), wire.is_inside(Side::Right))
    };
    if !left_in {
        state.triggers.insert(SensorTriggers::PERIMETER_LEFT);
    }
    if !right_in {
        state.triggers.insert(SensorTriggers::PERIMETER_RIGHT);
    }

    let next = match mow {
        MowState::Line => line(state, platform, maneuver, left_in && right_in),
        MowState::Reverse => reverse(state, platform, now_ms, maneuver),
        MowState::Rotate => rotate(state, platform, maneuver),
        MowState::EnterLine => enter_line(state, platform, maneuver, now_ms),
    };
    Activity::Mowing(next)
}

fn line<P: Platform>(state: &mut ControllerState, platform: &mut P, maneuver: &ManeuverConfig, inside: bool) -> MowState {
    let motion = platform.motion();
    if inside && !motion.is_stopped() {
        return MowState::Line;
    }
    motion.stop_immediately();
    motion.travel_line_distance(maneuver.reverse_distance_cm, state.mowing_angle, -state.speed.reverse);
    MowState::Reverse
}

fn reverse<P: Platform>(
    state: &mut ControllerState,
    platform: &mut P,
    now_ms: u64,
    maneuver: &ManeuverConfig,
) -> MowState {
    if !platform.motion().is_stopped() {
        return MowState::Reverse;
    }

    if state.mow_pattern == MowPattern::Lanes {
        let elapsed = now_ms.saturating_sub(state.last_line_start_ms);
        let turn = next_lane(state.mowing_angle, state.mowing_direction, elapsed, maneuver);
        if elapsed < maneuver.short_lane_ms {
            debug!("lane lasted {} ms, new lane direction", elapsed);
        }
        state.mowing_angle = turn.mowing_angle;
        state.mowing_direction = turn.mowing_direction;
        state.rotate_angle = turn.rotate_angle;
    } else {
        let offset = platform
            .random()
            .range_inclusive(-RANDOM_OFFSET_DEG, RANDOM_OFFSET_DEG);
        state.mowing_angle = random_heading(state.mowing_angle, offset);
        state.rotate_angle = state.mowing_angle;
    }

    platform
        .motion()
        .rotate_angle(state.rotate_angle, state.speed.rotation);
    MowState::Rotate
}

fn rotate<P: Platform>(state: &mut ControllerState, platform: &mut P, maneuver: &ManeuverConfig) -> MowState {
    let motion = platform.motion();
    if !motion.is_stopped() {
        return MowState::Rotate;
    }
    if state.mow_pattern == MowPattern::Lanes {
        motion.travel_line_distance(maneuver.enter_line_distance_cm, state.rotate_angle, FULL_SPEED);
        MowState::EnterLine
    } else {
        motion.travel_line_distance(maneuver.mow_line_distance_cm, state.mowing_angle, FULL_SPEED);
        MowState::Line
    }
}

fn enter_line<P: Platform>(
    state: &mut ControllerState,
    platform: &mut P,
    maneuver: &ManeuverConfig,
    now_ms: u64,
) -> MowState {
    let motion = platform.motion();
    if !motion.is_stopped() {
        return MowState::EnterLine;
    }
    motion.travel_line_distance(maneuver.mow_line_distance_cm, state.mowing_angle, FULL_SPEED);
    state.last_line_start_ms = now_ms;
    MowState::Line
}
