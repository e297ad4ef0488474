//! Operator Commands
//!
//! Channel carrying [`Command`]s from the RC buttons and the charger sense to
//! the control loop. The control loop drains it between scheduler polls, so a
//! command is never applied in the middle of a control tick.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use mower_core::Command;

/// Multi-producer, single-consumer command channel with capacity of 8
pub static COMMAND_CHANNEL: Channel<CriticalSectionRawMutex, Command, 8> = Channel::new();

/// Sends a command to the control loop
pub async fn send(command: Command) {
    COMMAND_CHANNEL.sender().send(command).await;
}

/// Takes the next pending command without waiting
pub fn try_receive() -> Option<Command> {
    COMMAND_CHANNEL.receiver().try_receive().ok()
}
