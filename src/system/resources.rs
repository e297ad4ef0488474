//! Hardware Resource Management
//!
//! Assigns the RP2350 pins and peripherals to the tasks that own them.
//!
//! # Resource Groups
//! - Motor Control: TB6612FNG dual driver pins and PWM slices
//! - Perimeter: the two coil amplifier outputs on ADC pins
//! - IMU: MPU6500 on I2C0
//! - Charger: charging contact sense pin
//! - Buzzer: PWM driven piezo
//! - RC Control: remote control button input pins
//!
//! # Shared Resources
//! The ADC is shared between tasks and protected by a mutex. Tasks acquire
//! the lock for a single conversion and release it right away.

use assign_resources::assign_resources;
use embassy_rp::adc::InterruptHandler as AdcInterruptHandler;
use embassy_rp::adc::{Adc, Async as AdcAsync};
use embassy_rp::bind_interrupts;
use embassy_rp::i2c::InterruptHandler as I2cInterruptHandler;
use embassy_rp::peripherals::{self, ADC, I2C0};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;

/// Global ADC instance protected by a mutex
static ADC: Mutex<CriticalSectionRawMutex, Option<Adc<'static, AdcAsync>>> = Mutex::new(None);

/// Initializes the ADC peripheral.
///
/// Called once from main before any task is spawned, so the lock is always free.
pub fn init_adc(adc: ADC) {
    let adc = Adc::new(adc, Irqs, embassy_rp::adc::Config::default());
    if let Ok(mut slot) = ADC.try_lock() {
        *slot = Some(adc);
    }
}

/// Returns a reference to the protected ADC instance.
pub fn get_adc() -> &'static Mutex<CriticalSectionRawMutex, Option<Adc<'static, AdcAsync>>> {
    &ADC
}

assign_resources! {
    /// TB6612FNG dual motor driver pins and PWM channels
    motor_driver: MotorDriverResources {
        standby_pin: PIN_22,
        left_slice: PWM_SLICE6,
        left_pwm_pin: PIN_28,
        left_forward_pin: PIN_21,
        left_backward_pin: PIN_20,
        right_slice: PWM_SLICE5,
        right_pwm_pin: PIN_11,
        right_forward_pin: PIN_19,
        right_backward_pin: PIN_18,
    },
    /// Perimeter coil amplifier outputs
    perimeter: PerimeterResources {
        left_coil_pin: PIN_26,
        right_coil_pin: PIN_27,
    },
    /// MPU6500 6-axis IMU
    imu: ImuResources {
        i2c: I2C0,
        scl: PIN_13,
        sda: PIN_12,
    },
    /// Charging contact sense, high while the station powers the contacts
    charger: ChargerResources {
        sense_pin: PIN_7,
    },
    /// Piezo buzzer
    buzzer: BuzzerResources {
        slice: PWM_SLICE7,
        pin: PIN_14,
    },
    /// Remote control buttons
    rc_a: RCResourcesA {
        btn_a: PIN_16,
    },
    rc_b: RCResourcesB {
        btn_b: PIN_17,
    },
    rc_c: RCResourcesC {
        btn_c: PIN_10,
    },
    rc_d: RCResourcesD {
        btn_d: PIN_9,
    },
}

bind_interrupts!(pub struct Irqs {
    ADC_IRQ_FIFO => AdcInterruptHandler;
    I2C0_IRQ => I2cInterruptHandler<I2C0>;
});
