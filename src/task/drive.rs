//! Drive Task Module
//!
//! Executes motion commands on the TB6612FNG motor driver. Straight runs hold
//! their heading with a proportional correction from the IMU heading;
//! rotations run until the heading matches or the pulse time is over. Ground
//! distance and position are dead-reckoned from commanded power, there are no
//! wheel encoders on the mower.

use core::f32::consts::PI;

use defmt::info;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio;
use embassy_rp::pwm;
use embassy_time::{Duration, Ticker, Timer};
use mower_core::angle;
use tb6612fng::{DriveCommand, Motor, Tb6612fng};

use crate::system::error::{self, DriveError};
use crate::system::motion::{self, Motion, MotionCommand, MotionStatus, MOTION_STATUS, PAUSED};
use crate::system::resources::MotorDriverResources;
use crate::system::sensors::ORIENTATION;

/// Drive control period
const CYCLE: Duration = Duration::from_millis(20);
const CYCLE_S: f32 = 0.02;

/// Ground speed at full power (cm/s), used for dead reckoning
const FULL_SPEED_CM_PER_S: f32 = 30.0;

/// Heading hold gain, power difference per radian of error
const HEADING_GAIN: f32 = 1.2;

/// Largest heading hold correction
const MAX_CORRECTION: f32 = 0.4;

/// Rotation finishes inside this heading error (rad)
const ROTATE_TOLERANCE: f32 = 3.0 * PI / 180.0;

type DriveMotor = Motor<gpio::Output<'static>, gpio::Output<'static>, pwm::Pwm<'static>>;

/// Per side power in [-1, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, defmt::Format)]
struct Power {
    left: f32,
    right: f32,
}

/// Motion command in progress
struct Active {
    command: MotionCommand,
    elapsed_ms: u32,
    travelled_cm: f32,
}

impl Active {
    fn new(command: MotionCommand) -> Self {
        Self {
            command,
            elapsed_ms: 0,
            travelled_cm: 0.0,
        }
    }

    /// One control cycle: returns the motor power and whether the command is complete
    fn step(&mut self, heading: f32) -> (Power, bool) {
        self.elapsed_ms += CYCLE.as_millis() as u32;
        match self.command.motion {
            Motion::Stop => (Power::default(), true),
            Motion::Power { left, right } => (Power { left, right }, true),
            Motion::TravelDistance {
                distance_cm,
                heading: target,
                speed,
            } => {
                self.travelled_cm += libm::fabsf(speed) * FULL_SPEED_CM_PER_S * CYCLE_S;
                (hold_heading(target, heading, speed), self.travelled_cm >= distance_cm)
            }
            Motion::TravelTime {
                duration_ms,
                heading: target,
                speed,
            } => (hold_heading(target, heading, speed), self.elapsed_ms >= duration_ms),
            Motion::RotateTo { target, speed } => {
                let error = angle::distance(heading, target);
                if libm::fabsf(error) < ROTATE_TOLERANCE {
                    (Power::default(), true)
                } else {
                    (spin(libm::copysignf(libm::fabsf(speed), error)), false)
                }
            }
            Motion::RotateTime { duration_ms, speed } => (spin(speed), self.elapsed_ms >= duration_ms),
        }
    }
}

/// Straight run with a proportional heading correction
fn hold_heading(target: f32, heading: f32, speed: f32) -> Power {
    let correction = (HEADING_GAIN * angle::distance(heading, target)).clamp(-MAX_CORRECTION, MAX_CORRECTION);
    Power {
        left: (speed - correction).clamp(-1.0, 1.0),
        right: (speed + correction).clamp(-1.0, 1.0),
    }
}

/// Turn on the spot, positive speed turns counter-clockwise
fn spin(speed: f32) -> Power {
    Power {
        left: -speed,
        right: speed,
    }
}

fn drive_motor(motor: &mut DriveMotor, power: f32) -> Result<(), DriveError> {
    let duty = (libm::fabsf(power) * 100.0).clamp(0.0, 100.0) as u8;
    let command = if duty == 0 {
        DriveCommand::Stop
    } else if power > 0.0 {
        DriveCommand::Forward(duty)
    } else {
        DriveCommand::Backward(duty)
    };
    motor.drive(command).map_err(|_| DriveError::Driver)
}

#[embassy_executor::task]
pub async fn drive(r: MotorDriverResources) {
    // Configure PWM for motor control
    // We use 10kHz frequency as cheaper DC motors often work better at lower frequencies
    let desired_freq_hz = 10_000;
    let clock_freq_hz = embassy_rp::clocks::clk_sys_freq(); // 150MHz

    // Calculate minimum divider needed to keep period under 16-bit limit (65535)
    let divider = ((clock_freq_hz / desired_freq_hz) / 65535 + 1) as u8;
    let period = (clock_freq_hz / (desired_freq_hz * divider as u32)) as u16 - 1;

    let mut pwm_config = pwm::Config::default();
    pwm_config.divider = divider.into();
    pwm_config.top = period;

    let stby = gpio::Output::new(r.standby_pin, gpio::Level::Low);

    let left_fwd = gpio::Output::new(r.left_forward_pin, gpio::Level::Low);
    let left_bckw = gpio::Output::new(r.left_backward_pin, gpio::Level::Low);
    let left_pwm = pwm::Pwm::new_output_a(r.left_slice, r.left_pwm_pin, pwm_config.clone());

    let right_fwd = gpio::Output::new(r.right_forward_pin, gpio::Level::Low);
    let right_bckw = gpio::Output::new(r.right_backward_pin, gpio::Level::Low);
    let right_pwm = pwm::Pwm::new_output_b(r.right_slice, r.right_pwm_pin, pwm_config);

    let motors = Motor::new(left_fwd, left_bckw, left_pwm)
        .and_then(|left| Motor::new(right_fwd, right_bckw, right_pwm).map(|right| (left, right)));
    let Ok((left_motor, right_motor)) = motors else {
        error::report(DriveError::Driver);
        return;
    };
    let Ok(mut control) = Tb6612fng::new(left_motor, right_motor, stby) else {
        error::report(DriveError::Standby);
        return;
    };
    if control.disable_standby().is_err() {
        error::report(DriveError::Standby);
        return;
    }
    Timer::after(Duration::from_millis(100)).await;
    info!("drive ready");

    let mut active: Option<Active> = None;
    let mut status = MOTION_STATUS.read();
    let mut ticker = Ticker::every(CYCLE);

    loop {
        if let Either::First(command) = select(motion::wait(), ticker.next()).await {
            info!("motion {}", command.motion);
            active = Some(Active::new(command));
        }

        let orientation = ORIENTATION.read();
        let power = match active.as_mut() {
            Some(_) if PAUSED.read() => Power::default(),
            Some(current) => {
                let (power, done) = current.step(orientation.heading);
                if done {
                    status.finished_seq = current.command.seq;
                    // raw power stays applied until the next command
                    if !matches!(current.command.motion, Motion::Power { .. }) {
                        active = None;
                    }
                }
                power
            }
            None => Power::default(),
        };

        // dead reckoning from the mean commanded power
        let ground_speed_m_s = (power.left + power.right) / 2.0 * FULL_SPEED_CM_PER_S / 100.0;
        status.x += libm::cosf(orientation.heading) * ground_speed_m_s * CYCLE_S;
        status.y += libm::sinf(orientation.heading) * ground_speed_m_s * CYCLE_S;
        MOTION_STATUS.publish(status);

        let result = drive_motor(&mut control.motor_a, power.left).and(drive_motor(&mut control.motor_b, power.right));
        if let Err(e) = result {
            error::report(e);
        }
    }
}
