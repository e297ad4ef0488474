//! Sensor snapshots
//!
//! Latest readings published by the hardware tasks, plus the signals the
//! control loop uses to talk back to them.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use mower_core::service::AlarmKind;

use crate::system::shared::SharedCell;

/// Filtered perimeter coil readings
#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub struct WireReading {
    /// Signed magnitudes, negative inside the loop
    pub left: f32,
    pub right: f32,
    pub left_inside: bool,
    pub right_inside: bool,
    /// No inside reading on either coil for the timeout window
    pub timed_out: bool,
}

/// Fused orientation, radians
#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub struct OrientationReading {
    pub heading: f32,
    pub roll: f32,
    pub pitch: f32,
    /// Gyro bias not estimated since power on
    pub needs_calibration: bool,
    pub calibrating: bool,
}

pub static WIRE: SharedCell<WireReading> = SharedCell::new(WireReading {
    left: 0.0,
    right: 0.0,
    left_inside: false,
    right_inside: false,
    timed_out: false,
});

pub static ORIENTATION: SharedCell<OrientationReading> = SharedCell::new(OrientationReading {
    heading: 0.0,
    roll: 0.0,
    pitch: 0.0,
    needs_calibration: true,
    calibrating: false,
});

/// Debounced charging contact state
pub static CHARGER_CONNECTED: SharedCell<bool> = SharedCell::new(false);

/// Restart the perimeter timeout window
pub static WIRE_TIMEOUT_RESET: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Start a gyro bias calibration
pub static GYRO_CALIBRATION: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Tone requests for the buzzer task
pub static ALARM: Signal<CriticalSectionRawMutex, AlarmKind> = Signal::new();
