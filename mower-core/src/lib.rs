//! Navigation and mowing control core for a perimeter-wire guided mower
//!
//! Decides, once per control tick, which motion command the robot issues next.
//! Everything hardware related is reached through the traits in [`service`],
//! so the state machines run unchanged on the robot and in host tests.
//!
//! # Modules
//!
//! - [`scheduler`]: multi-rate dispatcher (orientation 100 Hz, control 5 Hz, telemetry 1 Hz)
//! - [`controller`]: top-level robot state machine and command surface
//! - [`safety`]: tilt, wire timeout, charger and gyro calibration interlocks
//! - [`tracking`]: wire following and boundary mapping
//! - [`mowing`]: lane and random coverage patterns
//! - [`outline`]: bounded boundary outline recorded while mapping
//! - [`state`]: controller state and its read-only telemetry snapshot
//! - [`service`]: collaborator contracts (motion, wire, orientation, mapper, alarm, charger)
//! - [`testing`]: recording fakes for host tests
//!
//! # Example
//!
//! ```
//! use mower_core::clock::MockClock;
//! use mower_core::config::ControllerConfig;
//! use mower_core::controller::Controller;
//! use mower_core::scheduler::Scheduler;
//! use mower_core::state::RobotMode;
//! use mower_core::testing::{FakePlatform, NullTelemetry};
//!
//! let config = ControllerConfig::default();
//! let mut controller = Controller::new(config, FakePlatform::new()).unwrap();
//! let clock = MockClock::new();
//! let mut scheduler = Scheduler::new(&clock, config.scheduler);
//!
//! controller.start_lane_mowing();
//! scheduler.poll(&mut controller, &mut NullTelemetry);
//! assert_eq!(controller.state().mode(), RobotMode::Mowing);
//! ```

#![no_std]

#[macro_use]
mod fmt;

pub mod angle;
pub mod clock;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod mowing;
pub mod outline;
pub mod random;
pub mod safety;
pub mod scheduler;
pub mod service;
pub mod state;
pub mod testing;
pub mod tracking;

pub use command::Command;
pub use config::ControllerConfig;
pub use controller::Controller;
pub use error::ConfigError;
pub use scheduler::Scheduler;
pub use state::{Activity, ControllerState, MowPattern, MowState, RobotMode, Telemetry, TrackState};
