//! Controller collaborators backed by the hardware tasks
//!
//! Each link turns a synchronous trait call from the control loop into a
//! signal for a task, or reads the snapshot a task published.

use embassy_time::Instant;
use mower_core::clock::Clock;
use mower_core::random::WyRandSource;
use mower_core::service::{Alarm, AlarmKind, Charger, Motion, Orientation, Platform, Side, WireGuidance};
use mower_core::state::{Telemetry, TelemetrySink};

use crate::system::mapper::OutlineMapper;
use crate::system::motion::{self, MotionCommand, MOTION_STATUS, PAUSED};
use crate::system::sensors::{
    OrientationReading, WireReading, ALARM, CHARGER_CONNECTED, GYRO_CALIBRATION, ORIENTATION, WIRE, WIRE_TIMEOUT_RESET,
};

/// Milliseconds since boot from the embassy time driver
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}

/// Issues motion commands to the drive task
pub struct DriveLink {
    seq: u32,
}

impl DriveLink {
    pub const fn new() -> Self {
        Self { seq: 0 }
    }

    fn issue(&mut self, motion: motion::Motion) {
        self.seq = self.seq.wrapping_add(1);
        motion::update(MotionCommand { seq: self.seq, motion });
    }
}

impl Motion for DriveLink {
    fn stop_immediately(&mut self) {
        self.issue(motion::Motion::Stop);
    }

    fn travel_line_distance(&mut self, distance_cm: f32, heading: f32, speed: f32) {
        self.issue(motion::Motion::TravelDistance {
            distance_cm,
            heading,
            speed,
        });
    }

    fn travel_line_time(&mut self, duration_ms: u32, heading: f32, speed: f32) {
        self.issue(motion::Motion::TravelTime {
            duration_ms,
            heading,
            speed,
        });
    }

    fn rotate_angle(&mut self, target: f32, speed: f32) {
        self.issue(motion::Motion::RotateTo { target, speed });
    }

    fn rotate_time(&mut self, duration_ms: u32, speed: f32) {
        self.issue(motion::Motion::RotateTime { duration_ms, speed });
    }

    fn set_paused(&mut self, paused: bool) {
        PAUSED.publish(paused);
    }

    fn set_power(&mut self, left: f32, right: f32) {
        self.issue(motion::Motion::Power { left, right });
    }

    fn is_stopped(&self) -> bool {
        MOTION_STATUS.read().finished_seq == self.seq
    }
}

/// Reads the perimeter task's filtered coil state
pub struct WireLink;

impl WireLink {
    fn reading(&self) -> WireReading {
        WIRE.read()
    }
}

impl WireGuidance for WireLink {
    fn magnitude(&self, side: Side) -> f32 {
        let reading = self.reading();
        match side {
            Side::Left => reading.left,
            Side::Right => reading.right,
        }
    }

    fn is_inside(&self, side: Side) -> bool {
        let reading = self.reading();
        match side {
            Side::Left => reading.left_inside,
            Side::Right => reading.right_inside,
        }
    }

    fn signal_timed_out(&self) -> bool {
        self.reading().timed_out
    }

    fn reset_timeout(&mut self) {
        WIRE.modify(|reading| reading.timed_out = false);
        WIRE_TIMEOUT_RESET.signal(());
    }
}

/// Latches the IMU task's fused orientation at the orientation cadence
pub struct ImuLink {
    latest: OrientationReading,
    /// Calibration requested but not yet acknowledged by the IMU task
    pending: bool,
}

impl ImuLink {
    pub const fn new() -> Self {
        Self {
            latest: OrientationReading {
                heading: 0.0,
                roll: 0.0,
                pitch: 0.0,
                needs_calibration: true,
                calibrating: false,
            },
            pending: false,
        }
    }
}

impl Orientation for ImuLink {
    fn update(&mut self) {
        self.latest = ORIENTATION.read();
        if self.latest.calibrating {
            self.pending = false;
        }
    }

    fn heading(&self) -> f32 {
        self.latest.heading
    }

    fn roll_pitch(&self) -> (f32, f32) {
        (self.latest.roll, self.latest.pitch)
    }

    fn needs_calibration(&self) -> bool {
        self.latest.needs_calibration && !self.pending
    }

    fn is_calibrating(&self) -> bool {
        self.pending || self.latest.calibrating
    }

    fn start_calibration(&mut self) {
        self.pending = true;
        GYRO_CALIBRATION.signal(());
    }
}

pub struct Buzzer;

impl Alarm for Buzzer {
    fn sound(&mut self, kind: AlarmKind) {
        ALARM.signal(kind);
    }
}

pub struct ChargeContacts;

impl Charger for ChargeContacts {
    fn is_connected(&self) -> bool {
        CHARGER_CONNECTED.read()
    }
}

/// Everything the controller drives on the robot
pub struct MowerPlatform {
    drive: DriveLink,
    wire: WireLink,
    imu: ImuLink,
    mapper: OutlineMapper,
    buzzer: Buzzer,
    charger: ChargeContacts,
    random: WyRandSource,
}

impl MowerPlatform {
    pub fn new(seed: u64) -> Self {
        Self {
            drive: DriveLink::new(),
            wire: WireLink,
            imu: ImuLink::new(),
            mapper: OutlineMapper::new(),
            buzzer: Buzzer,
            charger: ChargeContacts,
            random: WyRandSource::new(seed),
        }
    }
}

impl Platform for MowerPlatform {
    type Motion = DriveLink;
    type Wire = WireLink;
    type Orientation = ImuLink;
    type Mapper = OutlineMapper;
    type Alarm = Buzzer;
    type Charger = ChargeContacts;
    type Random = WyRandSource;

    fn motion(&mut self) -> &mut DriveLink {
        &mut self.drive
    }

    fn wire(&mut self) -> &mut WireLink {
        &mut self.wire
    }

    fn orientation(&mut self) -> &mut ImuLink {
        &mut self.imu
    }

    fn mapper(&mut self) -> &mut OutlineMapper {
        &mut self.mapper
    }

    fn alarm(&mut self) -> &mut Buzzer {
        &mut self.buzzer
    }

    fn charger(&mut self) -> &mut ChargeContacts {
        &mut self.charger
    }

    fn random(&mut self) -> &mut WyRandSource {
        &mut self.random
    }
}

/// Logs the 1 Hz snapshot over RTT
pub struct DefmtTelemetry;

impl TelemetrySink for DefmtTelemetry {
    fn emit(&mut self, telemetry: &Telemetry) {
        defmt::info!(
            "t={} mode={} track={} mow={} angle={} dir={} triggers={=u16:#x} loops={}",
            telemetry.timestamp_ms,
            telemetry.mode,
            telemetry.track_state,
            telemetry.mow_state,
            telemetry.mowing_angle,
            telemetry.mowing_direction,
            telemetry.sensor_triggers.bits(),
            telemetry.ticks_per_second
        );
    }
}
