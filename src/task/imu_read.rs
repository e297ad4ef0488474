//! IMU reading with the MPU6500 6-axis sensor
//!
//! Reads accelerometer and gyroscope over I2C at 100 Hz and fuses them with a
//! Madgwick filter into heading, roll and pitch. There is no magnetometer, so
//! the heading is relative to the power-on orientation and drifts with the
//! residual gyro bias.
//!
//! # Gyro calibration
//!
//! The bias is unknown at power on, so the task reports `needs_calibration`
//! until the first calibration. A calibration averages [`CALIBRATION_SAMPLES`]
//! gyro readings while the robot stands still; the control loop pauses the
//! motors for the duration.
//!
//! # AHRS Filter Configuration
//!
//! - Beta = 0.1: the gyro carries the heading, the accelerometer only levels
//!   roll and pitch, mowing vibrations are rejected
//! - 100 Hz update rate, matching the orientation cadence of the controller

use ahrs::{Ahrs, Madgwick};
use defmt::{info, warn};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_time::{Duration, Ticker, Timer};
use embedded_hal_async::i2c::I2c as _;
use nalgebra::Vector3;

use crate::system::error::{self, ImuError};
use crate::system::resources::{ImuResources, Irqs};
use crate::system::sensors::{OrientationReading, GYRO_CALIBRATION, ORIENTATION};

// Sampling configuration
const SAMPLE_INTERVAL: Duration = Duration::from_millis(10); // 100Hz sampling
const SAMPLE_RATE_HZ: f32 = 100.0;
const BETA: f32 = 0.1;

/// Gyro samples averaged for one bias estimate (2 s)
const CALIBRATION_SAMPLES: u32 = 200;

/// Failed reads in a row before the sensor is re-initialised
const MAX_CONSECUTIVE_FAILURES: u32 = 10;

const MPU6500_ADDR: u8 = 0x68;
const MPU6500_WHO_AM_I_VALUE: u8 = 0x70;

const REG_CONFIG: u8 = 0x1A;
const REG_GYRO_CONFIG: u8 = 0x1B;
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_ACCEL_CONFIG_2: u8 = 0x1D;
const REG_ACCEL_XOUT_H: u8 = 0x3B;
const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_WHO_AM_I: u8 = 0x75;

/// ±4 g full scale
const ACCEL_LSB_PER_G: f32 = 8192.0;
/// ±500 °/s full scale
const GYRO_LSB_PER_DPS: f32 = 65.5;

type ImuBus = I2c<'static, I2C0, i2c::Async>;

/// Raw sensor sample in g and rad/s
struct Sample {
    accel: Vector3<f32>,
    gyro: Vector3<f32>,
}

struct Mpu6500 {
    bus: ImuBus,
}

impl Mpu6500 {
    async fn write(&mut self, reg: u8, value: u8) -> Result<(), ImuError> {
        self.bus
            .write(MPU6500_ADDR, &[reg, value])
            .await
            .map_err(|_| ImuError::Bus)
    }

    async fn init(&mut self) -> Result<(), ImuError> {
        let mut who = [0u8; 1];
        self.bus
            .write_read(MPU6500_ADDR, &[REG_WHO_AM_I], &mut who)
            .await
            .map_err(|_| ImuError::Bus)?;
        if who[0] != MPU6500_WHO_AM_I_VALUE {
            return Err(ImuError::UnexpectedDevice(who[0]));
        }

        // reset, then wake up on the PLL clock
        self.write(REG_PWR_MGMT_1, 0x80).await?;
        Timer::after(Duration::from_millis(100)).await;
        self.write(REG_PWR_MGMT_1, 0x01).await?;
        // 41 Hz gyro DLPF, ±500 °/s, ±4 g, 41 Hz accel DLPF
        self.write(REG_CONFIG, 0x03).await?;
        self.write(REG_GYRO_CONFIG, 0x08).await?;
        self.write(REG_ACCEL_CONFIG, 0x08).await?;
        self.write(REG_ACCEL_CONFIG_2, 0x03).await?;
        Ok(())
    }

    async fn read(&mut self) -> Result<Sample, ImuError> {
        let mut raw = [0u8; 14];
        self.bus
            .write_read(MPU6500_ADDR, &[REG_ACCEL_XOUT_H], &mut raw)
            .await
            .map_err(|_| ImuError::Bus)?;
        let word = |i: usize| f32::from(i16::from_be_bytes([raw[i], raw[i + 1]]));
        let dps_to_rad = core::f32::consts::PI / 180.0 / GYRO_LSB_PER_DPS;
        Ok(Sample {
            accel: Vector3::new(word(0), word(2), word(4)) / ACCEL_LSB_PER_G,
            // bytes 6..8 hold the temperature
            gyro: Vector3::new(word(8), word(10), word(12)) * dps_to_rad,
        })
    }
}

/// Running mean of gyro readings at rest
struct BiasEstimate {
    sum: Vector3<f32>,
    count: u32,
}

impl BiasEstimate {
    fn new() -> Self {
        Self {
            sum: Vector3::zeros(),
            count: 0,
        }
    }

    /// Adds a sample, returns the bias once enough samples were collected
    fn add(&mut self, gyro: &Vector3<f32>) -> Option<Vector3<f32>> {
        self.sum += gyro;
        self.count += 1;
        (self.count >= CALIBRATION_SAMPLES).then(|| self.sum / self.count as f32)
    }
}

/// Embassy task that handles IMU measurements and gyro calibration
#[embassy_executor::task]
pub async fn imu_read(r: ImuResources) {
    let mut config = i2c::Config::default();
    config.frequency = 400_000;
    let bus = I2c::new_async(r.i2c, r.scl, r.sda, Irqs, config);
    let mut sensor = Mpu6500 { bus };

    while let Err(e) = sensor.init().await {
        error::report(e);
        Timer::after(Duration::from_secs(1)).await;
    }
    info!("MPU6500 initialized");

    let mut madgwick = Madgwick::new(1.0 / SAMPLE_RATE_HZ, BETA);
    let mut bias: Vector3<f32> = Vector3::zeros();
    let mut calibration: Option<BiasEstimate> = None;
    let mut reading = ORIENTATION.read();
    let mut failures = 0u32;
    let mut ticker = Ticker::every(SAMPLE_INTERVAL);

    loop {
        ticker.next().await;

        if GYRO_CALIBRATION.try_take().is_some() && calibration.is_none() {
            info!("gyro calibration started");
            calibration = Some(BiasEstimate::new());
            reading.calibrating = true;
            ORIENTATION.publish(reading);
        }

        let sample = match sensor.read().await {
            Ok(sample) => {
                failures = 0;
                sample
            }
            Err(e) => {
                failures += 1;
                error::report(e);
                if failures >= MAX_CONSECUTIVE_FAILURES {
                    warn!("IMU unresponsive, re-initialising");
                    if let Err(e) = sensor.init().await {
                        error::report(e);
                    }
                    failures = 0;
                }
                continue;
            }
        };

        if let Some(estimate) = calibration.as_mut() {
            if let Some(new_bias) = estimate.add(&sample.gyro) {
                bias = new_bias;
                calibration = None;
                reading.calibrating = false;
                reading.needs_calibration = false;
                info!("gyro bias {} {} {} rad/s", bias.x, bias.y, bias.z);
            }
        }

        let gyro = sample.gyro - bias;
        match madgwick.update_imu(&gyro, &sample.accel) {
            Ok(quat) => {
                let (roll, pitch, yaw) = quat.euler_angles();
                reading.heading = yaw;
                reading.roll = roll;
                reading.pitch = pitch;
            }
            Err(_) => warn!("madgwick update rejected the sample"),
        }
        ORIENTATION.publish(reading);
    }
}
