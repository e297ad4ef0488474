//! Firmware error types
//!
//! Hardware tasks log these and keep running in a degraded way; nothing in
//! the firmware panics on a sensor or driver fault.

use defmt::Format;
use thiserror::Error;

/// MPU6500 access failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum ImuError {
    #[error("i2c transfer failed")]
    Bus,
    #[error("unexpected WHO_AM_I {0:#04x}")]
    UnexpectedDevice(u8),
}

/// TB6612FNG driver failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum DriveError {
    #[error("motor driver pin or pwm error")]
    Driver,
    #[error("standby pin error")]
    Standby,
}

/// Analog sensor failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum SensorError {
    #[error("adc conversion failed")]
    Adc,
    #[error("adc not initialised")]
    AdcUnavailable,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum MowerError {
    #[error("imu: {0}")]
    Imu(#[from] ImuError),
    #[error("drive: {0}")]
    Drive(#[from] DriveError),
    #[error("sensor: {0}")]
    Sensor(#[from] SensorError),
}

/// Logs a hardware fault, the caller decides how to degrade
pub fn report(error: impl Into<MowerError>) {
    let error: MowerError = error.into();
    defmt::warn!("hardware fault: {}", error);
}
