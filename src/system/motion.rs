//! Motion Commands
//!
//! The control loop issues [`MotionCommand`]s through a signal; the drive task
//! executes them and publishes a [`MotionStatus`]. Every command carries a
//! sequence number, so a completion report for an older command can never
//! mark a newer one as finished.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use crate::system::shared::SharedCell;

/// Motion requests understood by the drive task
#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub enum Motion {
    /// Cut power and hold still
    Stop,
    /// Drive `distance_cm` along `heading`, negative speed reverses
    TravelDistance { distance_cm: f32, heading: f32, speed: f32 },
    /// Drive along `heading` for `duration_ms`
    TravelTime { duration_ms: u32, heading: f32, speed: f32 },
    /// Turn on the spot to face `target`
    RotateTo { target: f32, speed: f32 },
    /// Turn on the spot for `duration_ms`, positive speed turns counter-clockwise
    RotateTime { duration_ms: u32, speed: f32 },
    /// Open loop power per side
    Power { left: f32, right: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub struct MotionCommand {
    pub seq: u32,
    pub motion: Motion,
}

/// Drive task progress, published after every drive cycle
#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub struct MotionStatus {
    /// Sequence number of the last command that finished or was stopped
    pub finished_seq: u32,
    /// Dead-reckoned position in metres since power on
    pub x: f32,
    pub y: f32,
}

/// Pending command for the drive task
static MOTION: Signal<CriticalSectionRawMutex, MotionCommand> = Signal::new();

/// Latest drive task progress
pub static MOTION_STATUS: SharedCell<MotionStatus> = SharedCell::new(MotionStatus {
    finished_seq: 0,
    x: 0.0,
    y: 0.0,
});

/// While set the drive task holds the motors still without dropping the command
pub static PAUSED: SharedCell<bool> = SharedCell::new(false);

/// Sends a new motion command, replacing one that was not picked up yet
pub fn update(command: MotionCommand) {
    MOTION.signal(command);
}

/// Waits for the next motion command
pub async fn wait() -> MotionCommand {
    MOTION.wait().await
}

/// Takes a pending motion command without waiting
pub fn try_take() -> Option<MotionCommand> {
    MOTION.try_take()
}
