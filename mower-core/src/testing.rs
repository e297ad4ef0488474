//! Recording fakes for host tests
//!
//! [`FakePlatform`] implements every collaborator with plain public fields:
//! tests set sensor readings directly and inspect what the controller asked
//! for afterwards.

use heapless::Vec;

use crate::random::RandomSource;
use crate::service::{Alarm, AlarmKind, BoundaryMapper, Charger, Motion, Orientation, Platform, Side, WireGuidance};
use crate::state::{Telemetry, TelemetrySink};

/// Magnitude of a coil well inside the loop
pub const INSIDE: f32 = -1.0;
/// Magnitude of a coil outside the loop
pub const OUTSIDE: f32 = 1.0;

const MAX_CALLS: usize = 128;
const MAX_SOUNDS: usize = 16;
const MAX_SNAPSHOTS: usize = 32;

/// Pushes into a bounded log, dropping the oldest entry when full
fn record<T, const N: usize>(log: &mut Vec<T, N>, item: T) {
    if log.is_full() {
        log.remove(0);
    }
    let _ = log.push(item);
}

/// One call into the motion service
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionCall {
    Stop,
    TravelDistance { distance_cm: f32, heading: f32, speed: f32 },
    TravelTime { duration_ms: u32, heading: f32, speed: f32 },
    RotateAngle { target: f32, speed: f32 },
    RotateTime { duration_ms: u32, speed: f32 },
    SetPower { left: f32, right: f32 },
}

/// Motion service that records calls
///
/// A commanded motion clears `stopped`; tests set it back to simulate the
/// motion completing.
#[derive(Debug)]
pub struct FakeMotion {
    pub stopped: bool,
    pub paused: bool,
    pub calls: Vec<MotionCall, MAX_CALLS>,
}

impl Default for FakeMotion {
    fn default() -> Self {
        Self {
            stopped: true,
            paused: false,
            calls: Vec::new(),
        }
    }
}

impl FakeMotion {
    fn moving(&mut self, call: MotionCall) {
        self.stopped = false;
        record(&mut self.calls, call);
    }
}

impl Motion for FakeMotion {
    fn stop_immediately(&mut self) {
        self.stopped = true;
        record(&mut self.calls, MotionCall::Stop);
    }

    fn travel_line_distance(&mut self, distance_cm: f32, heading: f32, speed: f32) {
        self.moving(MotionCall::TravelDistance {
            distance_cm,
            heading,
            speed,
        });
    }

    fn travel_line_time(&mut self, duration_ms: u32, heading: f32, speed: f32) {
        self.moving(MotionCall::TravelTime {
            duration_ms,
            heading,
            speed,
        });
    }

    fn rotate_angle(&mut self, target: f32, speed: f32) {
        self.moving(MotionCall::RotateAngle { target, speed });
    }

    fn rotate_time(&mut self, duration_ms: u32, speed: f32) {
        self.moving(MotionCall::RotateTime { duration_ms, speed });
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn set_power(&mut self, left: f32, right: f32) {
        record(&mut self.calls, MotionCall::SetPower { left, right });
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }
}

/// Perimeter readings set by the test, inside means a negative magnitude
#[derive(Debug)]
pub struct FakeWire {
    pub left: f32,
    pub right: f32,
    pub timed_out: bool,
    pub timeout_resets: u32,
}

impl Default for FakeWire {
    fn default() -> Self {
        Self {
            left: INSIDE,
            right: INSIDE,
            timed_out: false,
            timeout_resets: 0,
        }
    }
}

impl WireGuidance for FakeWire {
    fn magnitude(&self, side: Side) -> f32 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    fn is_inside(&self, side: Side) -> bool {
        self.magnitude(side) < 0.0
    }

    fn signal_timed_out(&self) -> bool {
        self.timed_out
    }

    fn reset_timeout(&mut self) {
        self.timed_out = false;
        self.timeout_resets += 1;
    }
}

#[derive(Debug, Default)]
pub struct FakeOrientation {
    pub heading: f32,
    pub roll: f32,
    pub pitch: f32,
    pub needs_calibration: bool,
    pub calibrating: bool,
    pub calibrations_started: u32,
    pub updates: u32,
}

impl FakeOrientation {
    pub fn finish_calibration(&mut self) {
        self.calibrating = false;
    }
}

impl Orientation for FakeOrientation {
    fn update(&mut self) {
        self.updates += 1;
    }

    fn heading(&self) -> f32 {
        self.heading
    }

    fn roll_pitch(&self) -> (f32, f32) {
        (self.roll, self.pitch)
    }

    fn needs_calibration(&self) -> bool {
        self.needs_calibration
    }

    fn is_calibrating(&self) -> bool {
        self.calibrating
    }

    fn start_calibration(&mut self) {
        self.needs_calibration = false;
        self.calibrating = true;
        self.calibrations_started += 1;
    }
}

/// Mapper that counts calls and reports a settable distance to the start point
#[derive(Debug)]
pub struct FakeMapper {
    pub updates: u32,
    pub clears: u32,
    pub particle_distributions: u32,
    pub corrections: u32,
    pub commits: u32,
    pub saves: u32,
    pub position: (f32, f32),
    pub distance_to_origin: f32,
}

impl Default for FakeMapper {
    fn default() -> Self {
        Self {
            updates: 0,
            clears: 0,
            particle_distributions: 0,
            corrections: 0,
            commits: 0,
            saves: 0,
            position: (0.0, 0.0),
            distance_to_origin: 100.0,
        }
    }
}

impl BoundaryMapper for FakeMapper {
    fn update(&mut self) {
        self.updates += 1;
    }

    fn clear_outline(&mut self) {
        self.clears += 1;
    }

    fn distribute_particles_along_outline(&mut self) {
        self.particle_distributions += 1;
    }

    fn correct_outline(&mut self) {
        self.corrections += 1;
    }

    fn commit_outline_to_map(&mut self) {
        self.commits += 1;
    }

    fn save_map(&mut self) {
        self.saves += 1;
    }

    fn robot_position(&self) -> (f32, f32) {
        self.position
    }

    fn distance_to_map_origin(&self, _x: f32, _y: f32) -> f32 {
        self.distance_to_origin
    }
}

#[derive(Debug, Default)]
pub struct FakeAlarm {
    sounds: Vec<AlarmKind, MAX_SOUNDS>,
}

impl FakeAlarm {
    pub fn sounded(&self) -> &[AlarmKind] {
        &self.sounds
    }
}

impl Alarm for FakeAlarm {
    fn sound(&mut self, kind: AlarmKind) {
        record(&mut self.sounds, kind);
    }
}

#[derive(Debug, Default)]
pub struct FakeCharger {
    pub connected: bool,
}

impl Charger for FakeCharger {
    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Replays queued values, clamped into the requested range
///
/// An empty queue yields the middle of the range.
#[derive(Debug, Default)]
pub struct SequenceRandom {
    queue: heapless::Deque<i32, 64>,
    last_range: Option<(i32, i32)>,
}

impl SequenceRandom {
    pub fn push(&mut self, value: i32) {
        let _ = self.queue.push_back(value);
    }

    /// Bounds of the most recent draw
    pub fn requested_range(&self) -> Option<(i32, i32)> {
        self.last_range
    }
}

impl RandomSource for SequenceRandom {
    fn range_inclusive(&mut self, low: i32, high: i32) -> i32 {
        self.last_range = Some((low, high));
        match self.queue.pop_front() {
            Some(value) => value.clamp(low, high),
            None => low + (high - low) / 2,
        }
    }
}

/// All collaborators in one place
///
/// The random source defaults to [`SequenceRandom`]; pass a seeded
/// [`WyRandSource`](crate::random::WyRandSource) to exercise the real generator.
#[derive(Debug, Default)]
pub struct FakePlatform<R = SequenceRandom> {
    pub motion: FakeMotion,
    pub wire: FakeWire,
    pub orientation: FakeOrientation,
    pub mapper: FakeMapper,
    pub alarm: FakeAlarm,
    pub charger: FakeCharger,
    pub random: R,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: RandomSource> FakePlatform<R> {
    pub fn with_random(random: R) -> Self {
        Self {
            motion: FakeMotion::default(),
            wire: FakeWire::default(),
            orientation: FakeOrientation::default(),
            mapper: FakeMapper::default(),
            alarm: FakeAlarm::default(),
            charger: FakeCharger::default(),
            random,
        }
    }

    pub fn set_magnitudes(&mut self, left: f32, right: f32) {
        self.wire.left = left;
        self.wire.right = right;
    }

    pub fn motion_calls(&self) -> &[MotionCall] {
        &self.motion.calls
    }

    pub fn clear_calls(&mut self) {
        self.motion.calls.clear();
    }
}

impl<R: RandomSource> Platform for FakePlatform<R> {
    type Motion = FakeMotion;
    type Wire = FakeWire;
    type Orientation = FakeOrientation;
    type Mapper = FakeMapper;
    type Alarm = FakeAlarm;
    type Charger = FakeCharger;
    type Random = R;

    fn motion(&mut self) -> &mut FakeMotion {
        &mut self.motion
    }

    fn wire(&mut self) -> &mut FakeWire {
        &mut self.wire
    }

    fn orientation(&mut self) -> &mut FakeOrientation {
        &mut self.orientation
    }

    fn mapper(&mut self) -> &mut FakeMapper {
        &mut self.mapper
    }

    fn alarm(&mut self) -> &mut FakeAlarm {
        &mut self.alarm
    }

    fn charger(&mut self) -> &mut FakeCharger {
        &mut self.charger
    }

    fn random(&mut self) -> &mut R {
        &mut self.random
    }
}

/// Telemetry sink that drops every snapshot
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn emit(&mut self, _telemetry: &Telemetry) {}
}

/// Telemetry sink that keeps the most recent snapshots
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    snapshots: Vec<Telemetry, MAX_SNAPSHOTS>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn last(&self) -> Option<&Telemetry> {
        self.snapshots.last()
    }

    pub fn snapshots(&self) -> &[Telemetry] {
        &self.snapshots
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn emit(&mut self, telemetry: &Telemetry) {
        record(&mut self.snapshots, *telemetry);
    }
}
