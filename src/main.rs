//! Mower firmware entry point
//!
//! Initializes the hardware and spawns the control loop and the hardware tasks.

#![no_std]
#![no_main]

use crate::task::{
    alarm::alarm,
    charger_detect::charger_detect,
    control_loop::control_loop,
    drive::drive,
    imu_read::imu_read,
    perimeter_read::perimeter_read,
    rc_control::{rc_button_a_handle, rc_button_b_handle, rc_button_c_handle, rc_button_d_handle},
};
use embassy_executor::Spawner;
use embassy_rp::block::ImageDef;
use embassy_rp::config::Config;
use system::resources::{
    self, AssignedResources, BuzzerResources, ChargerResources, ImuResources, MotorDriverResources, PerimeterResources,
    RCResourcesA, RCResourcesB, RCResourcesC, RCResourcesD,
};
use {defmt_rtt as _, panic_probe as _};

/// Firmware image type for bootloader
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

/// System core modules
mod system;
/// Task implementations
mod task;

/// Firmware entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Config::default());

    // The ADC is shared by the perimeter coils, it must exist before any task runs.
    resources::init_adc(p.ADC);

    let r = split_resources!(p);

    // Sensor tasks first so the controller starts on fresh readings
    spawner.spawn(imu_read(r.imu)).unwrap();
    spawner.spawn(perimeter_read(r.perimeter)).unwrap();
    spawner.spawn(charger_detect(r.charger)).unwrap();
    spawner.spawn(drive(r.motor_driver)).unwrap();
    spawner.spawn(alarm(r.buzzer)).unwrap();
    spawner.spawn(rc_button_a_handle(r.rc_a)).unwrap();
    spawner.spawn(rc_button_b_handle(r.rc_b)).unwrap();
    spawner.spawn(rc_button_c_handle(r.rc_c)).unwrap();
    spawner.spawn(rc_button_d_handle(r.rc_d)).unwrap();
    spawner.spawn(control_loop()).unwrap();
}
